//! Plan Generator: maps the weakest categories to a bounded, prioritized action list.
//!
//! The free tier always yields an empty plan. That is the paywall boundary and holds
//! for every input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assessment::catalog::{self, DEGREES};
use crate::assessment::scoring::{RankingEntry, ScoreCard};

/// Upper bound on actions emitted per category.
pub const MAX_ACTIONS_PER_CATEGORY: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

/// Source of truth for the tier of a submission. The client never decides it;
/// it only forwards the payment reference it got from checkout.
pub trait PremiumGate: Send + Sync {
    fn tier_for(&self, payment_reference: Option<&str>, email: &str) -> Tier;
}

/// Default gate while no payment provider is wired in: everyone gets the free tier.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeTierGate;

impl PremiumGate for FreeTierGate {
    fn tier_for(&self, _payment_reference: Option<&str>, _email: &str) -> Tier {
        Tier::Free
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanItem {
    pub category: String,
    pub score: f64,
    /// Starting degree (1-based) chosen from the score band.
    pub degree: usize,
    pub actions: Vec<String>,
}

/// Starting degree for a score: weaker scores begin at the foundational actions.
pub fn starting_degree(hundredths: u32) -> usize {
    match hundredths {
        0..=249 => 1,
        250..=349 => 2,
        _ => 3,
    }
}

/// Builds the development plan for the weakest categories (weakest first).
/// Unknown category keys are skipped.
pub fn generate_plan(opportunities: &[RankingEntry], tier: Tier) -> Vec<PlanItem> {
    if tier == Tier::Free {
        return Vec::new();
    }

    opportunities
        .iter()
        .filter_map(|entry| {
            let Some(reference) = catalog::lookup(&entry.key) else {
                debug!(category = %entry.key, "No catalog entry; skipping plan item");
                return None;
            };

            let degree = starting_degree(entry.hundredths());
            let actions: Vec<String> = reference.degrees[degree - 1..DEGREES]
                .iter()
                .flat_map(|actions| actions.iter())
                .take(MAX_ACTIONS_PER_CATEGORY)
                .map(|action| action.to_string())
                .collect();

            Some(PlanItem {
                category: entry.name.clone(),
                score: entry.score,
                degree,
                actions,
            })
        })
        .collect()
}

/// Personalized opening line for the report, from the overall score and the
/// strongest/weakest categories.
pub fn introduction(card: &ScoreCard) -> String {
    let strongest = card.strengths.first().map(|e| e.name.as_str());
    let weakest = card.opportunities.first().map(|e| e.name.as_str());

    let mut intro = match strongest {
        Some(best) if card.overall_score >= 4.0 => format!(
            "Parabéns! Você demonstra um excelente nível de desenvolvimento nas competências avaliadas. \
             Sua maior força está em {best}, que pode servir como base para alavancar outras áreas. "
        ),
        Some(best) if card.overall_score >= 3.0 => {
            format!("Você está no caminho certo! Possui uma base sólida, especialmente em {best}. ")
        }
        _ => "Este é um momento excelente para começar sua jornada de desenvolvimento! \
              Você tem grande potencial de crescimento. "
            .to_string(),
    };

    if let Some(worst) = weakest {
        intro.push_str(&format!(
            "O plano a seguir foca nas competências com maior oportunidade de impacto: \
             priorizamos {worst} como área principal de desenvolvimento."
        ));
    }
    intro
}
