//! Report Renderer: turns a `ReportData` bag into an HTML document.
//!
//! Runs synchronously on the request path, so it must stay fast and side-effect free.
//! `AppState` holds an `Arc<dyn ReportRenderer>`; the built-in `HtmlReportRenderer`
//! fills a static template by placeholder substitution.

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::assessment::plan::{PlanItem, Tier};
use crate::assessment::Respondent;
use crate::assessment::scoring::{Level, RankingEntry, ScoreCard};
use crate::report::templates::{LOCKED_PLAN_SECTION, PLAN_SECTION_TEMPLATE, REPORT_TEMPLATE};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("report has no ranked categories")]
    EmptyRanking,

    #[error("template is missing placeholder {0}")]
    MissingPlaceholder(&'static str),
}

/// Data bag handed to the renderer. Field names are stable.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date: String,
    pub time: String,
    pub overall_score: f64,
    pub overall_level: Level,
    pub introduction: String,
    pub ranking: Vec<RankingEntry>,
    pub strengths: Vec<RankingEntry>,
    pub opportunities: Vec<RankingEntry>,
    pub tier: Tier,
    pub plan: Vec<PlanItem>,
}

impl ReportData {
    pub fn new(
        respondent: &Respondent,
        card: &ScoreCard,
        tier: Tier,
        plan: Vec<PlanItem>,
        introduction: String,
        assessed_at: DateTime<Local>,
    ) -> Self {
        Self {
            name: respondent.name.clone(),
            email: respondent.email.clone(),
            phone: respondent.phone.clone(),
            date: assessed_at.format("%d/%m/%Y").to_string(),
            time: assessed_at.format("%H:%M").to_string(),
            overall_score: card.overall_score,
            overall_level: card.overall_level,
            introduction,
            ranking: card.ranking.clone(),
            strengths: card.strengths.clone(),
            opportunities: card.opportunities.clone(),
            tier,
            plan,
        }
    }
}

/// The template collaborator. Implement this to swap the rendering backend.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, data: &ReportData) -> Result<String, RenderError>;
}

const REQUIRED_PLACEHOLDERS: &[&str] = &[
    "{{name}}",
    "{{overall_score}}",
    "{{ranking_rows}}",
    "{{plan_section}}",
];

pub struct HtmlReportRenderer {
    template: String,
}

impl Default for HtmlReportRenderer {
    fn default() -> Self {
        Self {
            template: REPORT_TEMPLATE.to_string(),
        }
    }
}

impl HtmlReportRenderer {
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl ReportRenderer for HtmlReportRenderer {
    fn render(&self, data: &ReportData) -> Result<String, RenderError> {
        if data.ranking.is_empty() {
            return Err(RenderError::EmptyRanking);
        }
        if let Some(missing) = REQUIRED_PLACEHOLDERS
            .iter()
            .find(|p| !self.template.contains(**p))
        {
            return Err(RenderError::MissingPlaceholder(missing));
        }

        let ranking_rows = data
            .ranking
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                    i + 1,
                    escape_html(&entry.name),
                    entry.score,
                    entry.level
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let plan_section = match data.tier {
            Tier::Free => LOCKED_PLAN_SECTION.to_string(),
            Tier::Premium => {
                PLAN_SECTION_TEMPLATE.replace("{{plan_items}}", &render_plan_items(&data.plan))
            }
        };

        Ok(self
            .template
            .replace("{{name}}", &escape_html(&data.name))
            .replace("{{email}}", &escape_html(&data.email))
            .replace(
                "{{phone}}",
                &escape_html(data.phone.as_deref().unwrap_or("-")),
            )
            .replace("{{date}}", &data.date)
            .replace("{{time}}", &data.time)
            .replace("{{overall_score}}", &format!("{:.2}", data.overall_score))
            .replace("{{overall_level}}", data.overall_level.label())
            .replace("{{introduction}}", &escape_html(&data.introduction))
            .replace("{{ranking_rows}}", &ranking_rows)
            .replace("{{strengths}}", &render_entries(&data.strengths))
            .replace("{{opportunities}}", &render_entries(&data.opportunities))
            .replace("{{plan_section}}", &plan_section))
    }
}

fn render_entries(entries: &[RankingEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "<div class=\"competencia\"><span class=\"competencia-nome\">{}</span>: \
                 <span class=\"competencia-pontuacao\">{:.2}</span> ({})</div>",
                escape_html(&entry.name),
                entry.score,
                entry.level
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_plan_items(plan: &[PlanItem]) -> String {
    plan.iter()
        .map(|item| {
            let actions = item
                .actions
                .iter()
                .map(|a| format!("<li>{}</li>", escape_html(a)))
                .collect::<String>();
            format!(
                "<div class=\"competencia\"><strong>{}</strong> ({:.2})<ol>{}</ol></div>",
                escape_html(&item.category),
                item.score,
                actions
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escapes markup characters. Braces are escaped too so user text can never
/// introduce a `{{placeholder}}` into the template.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}
