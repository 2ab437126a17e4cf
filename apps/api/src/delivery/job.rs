//! Delivery Job: one background unit of work per accepted submission, and the
//! state machine it walks through:
//!
//! `Queued → Converting → {Converted | ConversionFailed} → Dispatching → {Delivered | DeliveryFailed} → Done`
//!
//! `Done` is reached on every path. Failures leave log records, never retries.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::delivery::mailer::{DeliveryMode, DispatchOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Converting,
    Converted,
    ConversionFailed,
    Dispatching,
    Delivered,
    DeliveryFailed,
    Done,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Converting => write!(f, "converting"),
            Self::Converted => write!(f, "converted"),
            Self::ConversionFailed => write!(f, "conversion_failed"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Delivered => write!(f, "delivered"),
            Self::DeliveryFailed => write!(f, "delivery_failed"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Legal successor states.
    fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Converting)
                | (Converting, Converted)
                | (Converting, ConversionFailed)
                | (Converted, Dispatching)
                | (ConversionFailed, Dispatching)
                | (Dispatching, Delivered)
                | (Dispatching, DeliveryFailed)
                | (Delivered, Done)
                | (DeliveryFailed, Done)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// Owned by the orchestrator from submission until `Done`. Holds its own copy of
/// the rendered HTML; nothing here borrows from the request.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub id: Uuid,
    pub recipient: Recipient,
    pub html: String,
    pub overall_score: f64,
    pub created_at: DateTime<Local>,
}

impl DeliveryJob {
    pub fn new(recipient: Recipient, html: String, overall_score: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            html,
            overall_score,
            created_at: Local::now(),
        }
    }

    /// `relatorio_<name>_<YYYYmmdd_HHMMSS>_<id8>.pdf`, with path separators and
    /// whitespace in the name replaced by underscores.
    pub fn pdf_file_name(&self) -> String {
        let name: String = self
            .recipient
            .name
            .trim()
            .chars()
            .map(|c| {
                if c.is_whitespace() || matches!(c, '/' | '\\' | '.' | ':') {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        let short_id = &self.id.simple().to_string()[..8];
        format!(
            "relatorio_{}_{}_{}.pdf",
            name,
            self.created_at.format("%Y%m%d_%H%M%S"),
            short_id
        )
    }
}

/// Record of one job's run through the state machine.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub transitions: Vec<JobState>,
    pub pdf_path: Option<PathBuf>,
    /// `None` until dispatch has run.
    pub outcome: Option<DispatchOutcome>,
}

impl JobReport {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            transitions: vec![JobState::Queued],
            pdf_path: None,
            outcome: None,
        }
    }

    pub fn state(&self) -> JobState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(JobState::Queued)
    }

    pub fn delivered(&self) -> bool {
        matches!(self.outcome, Some(DispatchOutcome::Delivered(_)))
    }

    /// Delivered, but with the report inline instead of the PDF. Decided by what the
    /// dispatcher actually sent, not by whether conversion produced a path.
    pub fn degraded(&self) -> bool {
        self.outcome == Some(DispatchOutcome::Delivered(DeliveryMode::Inline))
    }

    /// Moves to `next`. Illegal transitions are ignored and logged; the state
    /// machine only ever moves forward.
    pub fn advance(&mut self, next: JobState) {
        let current = self.state();
        if !current.can_advance_to(next) {
            debug!(job_id = %self.job_id, from = %current, to = %next, "Ignoring illegal job transition");
            return;
        }
        debug!(job_id = %self.job_id, from = %current, to = %next, "Job transition");
        self.transitions.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> DeliveryJob {
        DeliveryJob::new(
            Recipient {
                name: name.to_string(),
                email: "ana@example.com".to_string(),
            },
            "<html/>".to_string(),
            3.5,
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut report = JobReport::new(Uuid::new_v4());
        for state in [
            JobState::Converting,
            JobState::Converted,
            JobState::Dispatching,
            JobState::Delivered,
            JobState::Done,
        ] {
            report.advance(state);
        }
        assert_eq!(report.transitions.len(), 6);
        assert!(report.state().is_terminal());
    }

    #[test]
    fn test_illegal_transition_is_ignored() {
        let mut report = JobReport::new(Uuid::new_v4());
        report.advance(JobState::Done);
        assert_eq!(report.state(), JobState::Queued);
        report.advance(JobState::Converting);
        report.advance(JobState::Delivered);
        assert_eq!(report.state(), JobState::Converting);
    }

    #[test]
    fn test_degraded_follows_dispatch_mode() {
        let mut report = JobReport::new(Uuid::new_v4());
        assert!(!report.delivered());
        assert!(!report.degraded());

        // A path from the converter does not mean the PDF went out.
        report.pdf_path = Some(PathBuf::from("/tmp/x.pdf"));
        report.outcome = Some(DispatchOutcome::Delivered(DeliveryMode::Inline));
        assert!(report.delivered());
        assert!(report.degraded());

        report.outcome = Some(DispatchOutcome::Delivered(DeliveryMode::Attachment));
        assert!(!report.degraded());

        report.outcome = Some(DispatchOutcome::Failed);
        assert!(!report.delivered());
        assert!(!report.degraded());
    }

    #[test]
    fn test_pdf_file_name_is_sanitized() {
        let name = job("Ana  de/Souza").pdf_file_name();
        assert!(name.starts_with("relatorio_Ana__de_Souza_"), "{name}");
        assert!(name.ends_with(".pdf"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_job_state_display() {
        assert_eq!(JobState::ConversionFailed.to_string(), "conversion_failed");
        assert_eq!(JobState::Done.to_string(), "done");
    }
}
