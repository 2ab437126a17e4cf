//! Questionnaire layout: which categories exist and how many Likert questions each carries.

use serde::Serialize;
use thiserror::Error;

/// Lowest accepted Likert answer.
pub const MIN_ANSWER: u8 = 1;
/// Highest accepted Likert answer.
pub const MAX_ANSWER: u8 = 5;

/// A competency group scored from a fixed number of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDef {
    /// Stable lookup key into the action catalog (e.g. `pensamento_critico`).
    pub key: String,
    /// Display name, also the ranking tie-break key.
    pub name: String,
    pub questions: usize,
}

impl CategoryDef {
    pub fn new(key: &str, name: &str, questions: usize) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            questions,
        }
    }
}

/// Identifies one question: 0-based category index + 0-based question index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionId {
    pub category: usize,
    pub index: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuestionnaireError {
    #[error("questionnaire has no categories")]
    Empty,

    #[error("category '{0}' has no questions")]
    EmptyCategory(String),
}

/// Ordered set of categories. Flat question numbering (`pergunta_<n>`) runs across
/// categories in this order.
#[derive(Debug, Clone, Serialize)]
pub struct Questionnaire {
    categories: Vec<CategoryDef>,
}

/// The published survey: five competencies, ten questions each.
pub fn standard_layout() -> Vec<CategoryDef> {
    vec![
        CategoryDef::new("comunicacao", "Comunicação", 10),
        CategoryDef::new("organizacao", "Organização", 10),
        CategoryDef::new("proatividade", "Proatividade", 10),
        CategoryDef::new("pensamento_critico", "Pensamento Crítico", 10),
        CategoryDef::new("produtividade", "Produtividade", 10),
    ]
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self {
            categories: standard_layout(),
        }
    }
}

impl Questionnaire {
    /// Every category needs at least one question, otherwise its mean is undefined.
    pub fn new(categories: Vec<CategoryDef>) -> Result<Self, QuestionnaireError> {
        if categories.is_empty() {
            return Err(QuestionnaireError::Empty);
        }
        if let Some(empty) = categories.iter().find(|c| c.questions == 0) {
            return Err(QuestionnaireError::EmptyCategory(empty.key.clone()));
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[CategoryDef] {
        &self.categories
    }

    pub fn total_questions(&self) -> usize {
        self.categories.iter().map(|c| c.questions).sum()
    }

    /// Every question in flat order.
    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.categories
            .iter()
            .enumerate()
            .flat_map(|(category, def)| {
                (0..def.questions).map(move |index| QuestionId { category, index })
            })
    }

    /// Resolves an answer key. Accepts `pergunta_<n>` (1-based, flat) and
    /// `c<cat>_<q>` (both 1-based). Returns `None` for anything outside the layout.
    pub fn resolve_key(&self, key: &str) -> Option<QuestionId> {
        if let Some(n) = key.strip_prefix("pergunta_") {
            let n: usize = n.parse().ok()?;
            return self.from_flat(n.checked_sub(1)?);
        }

        let rest = key.strip_prefix('c')?;
        let (cat, q) = rest.split_once('_')?;
        let category = cat.parse::<usize>().ok()?.checked_sub(1)?;
        let index = q.parse::<usize>().ok()?.checked_sub(1)?;
        let def = self.categories.get(category)?;
        (index < def.questions).then_some(QuestionId { category, index })
    }

    /// Flat 1-based number, used in user-facing messages.
    pub fn flat_number(&self, id: QuestionId) -> usize {
        let before: usize = self.categories[..id.category]
            .iter()
            .map(|c| c.questions)
            .sum();
        before + id.index + 1
    }

    fn from_flat(&self, mut offset: usize) -> Option<QuestionId> {
        for (category, def) in self.categories.iter().enumerate() {
            if offset < def.questions {
                return Some(QuestionId {
                    category,
                    index: offset,
                });
            }
            offset -= def.questions;
        }
        None
    }
}
