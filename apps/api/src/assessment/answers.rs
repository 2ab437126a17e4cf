//! Answer Set validation: turns raw submitted key/value pairs into a complete,
//! range-checked set of Likert answers. Incomplete or invalid submissions are rejected whole.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::assessment::questionnaire::{QuestionId, Questionnaire, MAX_ANSWER, MIN_ANSWER};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssessmentError {
    #[error("Todas as {expected} perguntas devem ser respondidas (faltando: {})", format_missing(.missing))]
    IncompleteInput {
        expected: usize,
        missing: Vec<usize>,
    },

    #[error("Resposta inválida para '{question}': {value} (esperado inteiro entre {} e {})", MIN_ANSWER, MAX_ANSWER)]
    InvalidAnswerValue { question: String, value: String },

    #[error("Pergunta desconhecida: '{0}'")]
    UnknownQuestion(String),
}

fn format_missing(missing: &[usize]) -> String {
    const SHOWN: usize = 10;
    let mut listed = missing
        .iter()
        .take(SHOWN)
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if missing.len() > SHOWN {
        listed.push_str(&format!(" e mais {}", missing.len() - SHOWN));
    }
    listed
}

/// A complete, validated answer set. Answers are grouped per category in questionnaire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet {
    by_category: Vec<Vec<u8>>,
}

impl AnswerSet {
    /// Validates raw answers against the questionnaire.
    ///
    /// Policy: any unknown key or invalid value rejects the submission, then any
    /// missing question rejects it. Nothing is ever partially scored.
    pub fn from_raw(
        questionnaire: &Questionnaire,
        raw: &BTreeMap<String, Value>,
    ) -> Result<Self, AssessmentError> {
        let mut slots: BTreeMap<QuestionId, u8> = BTreeMap::new();

        for (key, value) in raw {
            let id = questionnaire
                .resolve_key(key)
                .ok_or_else(|| AssessmentError::UnknownQuestion(key.clone()))?;
            let answer = parse_answer(value).ok_or_else(|| AssessmentError::InvalidAnswerValue {
                question: key.clone(),
                value: value.to_string(),
            })?;
            slots.insert(id, answer);
        }

        let missing: Vec<usize> = questionnaire
            .question_ids()
            .filter(|id| !slots.contains_key(id))
            .map(|id| questionnaire.flat_number(id))
            .collect();
        if !missing.is_empty() {
            return Err(AssessmentError::IncompleteInput {
                expected: questionnaire.total_questions(),
                missing,
            });
        }

        let mut by_category: Vec<Vec<u8>> = questionnaire
            .categories()
            .iter()
            .map(|c| Vec::with_capacity(c.questions))
            .collect();
        // BTreeMap order is (category, index), so each category fills in question order.
        for (id, answer) in slots {
            by_category[id.category].push(answer);
        }

        Ok(Self { by_category })
    }

    /// Answers of one category, in question order.
    pub fn category(&self, category: usize) -> &[u8] {
        &self.by_category[category]
    }

    pub fn answer_count(&self) -> usize {
        self.by_category.iter().map(Vec::len).sum()
    }
}

/// Accepts JSON integers and numeric strings (HTML forms post strings).
fn parse_answer(value: &Value) -> Option<u8> {
    let n: i64 = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (i64::from(MIN_ANSWER)..=i64::from(MAX_ANSWER))
        .contains(&n)
        .then_some(n as u8)
}
