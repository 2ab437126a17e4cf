//! Scoring Engine: category means, overall score, ranking and strength/opportunity selection.
//!
//! Pure and deterministic: no I/O, no shared state, safe to call from any number of
//! request handlers concurrently.
//!
//! Rounding: category means are computed in exact integer hundredths and rounded
//! half-up (3.125 → 3.13). The overall score is the mean of the rounded category
//! means (every category weighs the same regardless of its question count), also
//! rounded half-up to hundredths.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::assessment::answers::AnswerSet;
use crate::assessment::questionnaire::Questionnaire;

/// Qualitative band of a score. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    VeryWeak,
    Weak,
    Regular,
    Good,
    Excellent,
}

impl Level {
    /// Step function over hundredths: thresholds at 1.5 / 2.5 / 3.5 / 4.5.
    pub fn from_hundredths(hundredths: u32) -> Self {
        match hundredths {
            450.. => Level::Excellent,
            350..=449 => Level::Good,
            250..=349 => Level::Regular,
            150..=249 => Level::Weak,
            _ => Level::VeryWeak,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Excellent => "Excelente",
            Level::Good => "Bom",
            Level::Regular => "Regular",
            Level::Weak => "Fraco",
            Level::VeryWeak => "Muito Fraco",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How many entries the strengths/opportunities selections hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringOptions {
    pub strengths: usize,
    pub opportunities: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            strengths: 2,
            opportunities: 3,
        }
    }
}

/// One ranked category. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub key: String,
    pub name: String,
    pub score: f64,
    pub level: Level,
    #[serde(skip)]
    hundredths: u32,
}

impl RankingEntry {
    pub fn new(key: &str, name: &str, hundredths: u32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            score: f64::from(hundredths) / 100.0,
            level: Level::from_hundredths(hundredths),
            hundredths,
        }
    }

    pub fn hundredths(&self) -> u32 {
        self.hundredths
    }

    /// Total order: score descending, then name ascending.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .hundredths
            .cmp(&self.hundredths)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Everything derived from one submission.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreCard {
    /// Category scores in questionnaire order.
    pub categories: Vec<RankingEntry>,
    pub overall_score: f64,
    pub overall_level: Level,
    /// Strongest first.
    pub ranking: Vec<RankingEntry>,
    /// Top-K, strongest first.
    pub strengths: Vec<RankingEntry>,
    /// Bottom-K, weakest first.
    pub opportunities: Vec<RankingEntry>,
}

/// Scores a validated answer set.
pub fn score(
    questionnaire: &Questionnaire,
    answers: &AnswerSet,
    options: ScoringOptions,
) -> ScoreCard {
    let categories: Vec<RankingEntry> = questionnaire
        .categories()
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let values = answers.category(i);
            let sum: u32 = values.iter().map(|&v| u32::from(v)).sum();
            RankingEntry::new(&def.key, &def.name, mean_hundredths(sum * 100, values.len()))
        })
        .collect();

    let overall = mean_hundredths(
        categories.iter().map(|c| c.hundredths).sum(),
        categories.len(),
    );

    let ranking = rank(categories.clone());
    let (strengths, opportunities) = select_extremes(&ranking, options);

    ScoreCard {
        categories,
        overall_score: f64::from(overall) / 100.0,
        overall_level: Level::from_hundredths(overall),
        ranking,
        strengths,
        opportunities,
    }
}

/// Sorts entries into the deterministic ranking order.
pub fn rank(mut entries: Vec<RankingEntry>) -> Vec<RankingEntry> {
    entries.sort_by(RankingEntry::rank_cmp);
    entries
}

/// Top-K strongest-first and bottom-K weakest-first. K is clamped to the ranking length.
pub fn select_extremes(
    ranking: &[RankingEntry],
    options: ScoringOptions,
) -> (Vec<RankingEntry>, Vec<RankingEntry>) {
    let strengths = ranking[..options.strengths.min(ranking.len())].to_vec();
    let bottom_start = ranking.len().saturating_sub(options.opportunities);
    let opportunities = ranking[bottom_start..].iter().rev().cloned().collect();
    (strengths, opportunities)
}

/// `total / count` rounded half-up, with `total` already scaled to hundredths.
fn mean_hundredths(total: u32, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let count = count as u32;
    (2 * total + count) / (2 * count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::questionnaire::CategoryDef;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn answers_from(q: &Questionnaire, values: &[u8]) -> AnswerSet {
        let raw: BTreeMap<String, Value> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("pergunta_{}", i + 1), json!(v)))
            .collect();
        AnswerSet::from_raw(q, &raw).unwrap()
    }

    /// 10 answers per category, each category filled with its own value.
    fn per_category(values: [u8; 5]) -> Vec<u8> {
        values.iter().flat_map(|&v| [v; 10]).collect()
    }

    #[test]
    fn test_all_fours_ties_resolve_alphabetically() {
        let q = Questionnaire::default();
        let card = score(&q, &answers_from(&q, &[4; 50]), ScoringOptions::default());

        assert!(card.categories.iter().all(|c| c.score == 4.0));
        assert_eq!(card.overall_score, 4.0);
        assert_eq!(card.overall_level, Level::Good);

        let names: Vec<&str> = card.ranking.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Comunicação",
                "Organização",
                "Pensamento Crítico",
                "Proatividade",
                "Produtividade"
            ]
        );
        assert!(card.ranking.iter().all(|r| r.level.label() == "Bom"));
    }

    #[test]
    fn test_level_boundaries_are_inclusive_on_lower_bound() {
        assert_eq!(Level::from_hundredths(450), Level::Excellent);
        assert_eq!(Level::from_hundredths(449), Level::Good);
        assert_eq!(Level::from_hundredths(350), Level::Good);
        assert_eq!(Level::from_hundredths(349), Level::Regular);
        assert_eq!(Level::from_hundredths(250), Level::Regular);
        assert_eq!(Level::from_hundredths(150), Level::Weak);
        assert_eq!(Level::from_hundredths(149), Level::VeryWeak);
        assert_eq!(Level::from_hundredths(100), Level::VeryWeak);
    }

    #[test]
    fn test_mean_rounds_half_up() {
        // 25 / 8 = 3.125 → 3.13
        assert_eq!(mean_hundredths(2500, 8), 313);
        // 10 / 3 = 3.333.. → 3.33
        assert_eq!(mean_hundredths(1000, 3), 333);
        // 20 / 3 = 6.666.. → 6.67
        assert_eq!(mean_hundredths(2000, 3), 667);
    }

    #[test]
    fn test_overall_is_mean_of_category_means_not_raw_answers() {
        let q = Questionnaire::new(vec![
            CategoryDef::new("a", "Alpha", 2),
            CategoryDef::new("b", "Beta", 8),
        ])
        .unwrap();
        // Alpha: [1, 1] → 1.00. Beta: eight 5s → 5.00.
        let mut values = vec![1, 1];
        values.extend([5; 8]);
        let card = score(&q, &answers_from(&q, &values), ScoringOptions::default());

        assert_eq!(card.overall_score, 3.0);
        let raw_mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
        assert!((raw_mean - 4.2).abs() < 1e-9);
        assert_ne!(card.overall_score, raw_mean);
    }

    #[test]
    fn test_category_mean_uses_half_up_rounding() {
        let q = Questionnaire::new(vec![CategoryDef::new("a", "Alpha", 8)]).unwrap();
        // sum 25 over 8 answers
        let card = score(
            &q,
            &answers_from(&q, &[4, 4, 4, 4, 3, 2, 2, 2]),
            ScoringOptions::default(),
        );
        assert_eq!(card.categories[0].score, 3.13);
    }

    #[test]
    fn test_overall_stays_within_likert_bounds() {
        let q = Questionnaire::default();
        for fill in [[1; 5], [5; 5], [1, 2, 3, 4, 5]] {
            let card = score(&q, &answers_from(&q, &per_category(fill)), ScoringOptions::default());
            assert!((1.0..=5.0).contains(&card.overall_score));
        }
    }

    #[test]
    fn test_strengths_and_opportunities_ordering() {
        let q = Questionnaire::default();
        // Comunicação 5, Organização 1, Proatividade 4, Pensamento Crítico 2, Produtividade 3
        let card = score(
            &q,
            &answers_from(&q, &per_category([5, 1, 4, 2, 3])),
            ScoringOptions::default(),
        );

        let strengths: Vec<&str> = card.strengths.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(strengths, vec!["Comunicação", "Proatividade"]);

        let opportunities: Vec<&str> = card.opportunities.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            opportunities,
            vec!["Organização", "Pensamento Crítico", "Produtividade"]
        );
    }

    #[test]
    fn test_selection_lengths_are_fixed() {
        let q = Questionnaire::default();
        for fill in [[3; 5], [1, 5, 1, 5, 1], [2, 3, 4, 5, 1]] {
            let card = score(&q, &answers_from(&q, &per_category(fill)), ScoringOptions::default());
            assert_eq!(card.strengths.len(), 2);
            assert_eq!(card.opportunities.len(), 3);
        }
    }

    #[test]
    fn test_selection_clamps_to_ranking_length() {
        let ranking = rank(vec![
            RankingEntry::new("a", "A", 300),
            RankingEntry::new("b", "B", 200),
        ]);
        let (strengths, opportunities) = select_extremes(
            &ranking,
            ScoringOptions {
                strengths: 5,
                opportunities: 5,
            },
        );
        assert_eq!(strengths.len(), 2);
        assert_eq!(opportunities[0].name, "B");
        assert_eq!(opportunities[1].name, "A");
    }

    #[test]
    fn test_ranking_is_deterministic_regardless_of_input_order() {
        let forward = rank(vec![
            RankingEntry::new("b", "Beta", 300),
            RankingEntry::new("a", "Alpha", 300),
            RankingEntry::new("c", "Gamma", 410),
        ]);
        let backward = rank(vec![
            RankingEntry::new("c", "Gamma", 410),
            RankingEntry::new("a", "Alpha", 300),
            RankingEntry::new("b", "Beta", 300),
        ]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].name, "Gamma");
        assert_eq!(forward[1].name, "Alpha");
    }
}
