use std::sync::Arc;

use crate::assessment::plan::PremiumGate;
use crate::assessment::questionnaire::Questionnaire;
use crate::assessment::scoring::ScoringOptions;
use crate::config::Config;
use crate::delivery::DeliveryOrchestrator;
use crate::report::ReportRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub questionnaire: Arc<Questionnaire>,
    pub scoring: ScoringOptions,
    /// Decides free vs premium. Default: FreeTierGate.
    pub premium_gate: Arc<dyn PremiumGate>,
    /// Pluggable template collaborator. Default: HtmlReportRenderer.
    pub renderer: Arc<dyn ReportRenderer>,
    pub orchestrator: Arc<DeliveryOrchestrator>,
}
