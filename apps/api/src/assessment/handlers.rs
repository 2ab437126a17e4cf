use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use axum::{extract::State, Form, Json};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::answers::AnswerSet;
use crate::assessment::plan::{generate_plan, introduction, PlanItem, Tier};
use crate::assessment::scoring::{score, Level, RankingEntry};
use crate::assessment::Respondent;
use crate::delivery::{DeliveryJob, Recipient};
use crate::errors::AppError;
use crate::report::ReportData;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitAssessmentRequest {
    #[serde(alias = "nome")]
    pub name: String,
    pub email: String,
    #[serde(default, alias = "celular")]
    pub phone: Option<String>,
    /// Checkout reference, resolved to a tier by the configured `PremiumGate`.
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(alias = "respostas")]
    pub answers: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionDetails {
    pub categories: usize,
    pub questions: usize,
    pub plan_items: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitAssessmentResponse {
    pub success: bool,
    pub message: String,
    pub overall_score: f64,
    pub overall_level: Level,
    pub overall_level_label: &'static str,
    pub html_content: String,
    pub ranking: Vec<RankingEntry>,
    pub strengths: Vec<RankingEntry>,
    pub opportunities: Vec<RankingEntry>,
    pub plan: Vec<PlanItem>,
    pub tier: Tier,
    /// `None` when the job could not be queued; the response is still a success.
    pub job_id: Option<Uuid>,
    pub delivery_status: &'static str,
    pub processing_time_ms: u64,
    pub details: SubmissionDetails,
}

/// POST /api/v1/assessments
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitAssessmentRequest>,
) -> Result<Json<SubmitAssessmentResponse>, AppError> {
    process_submission(&state, req).map(Json)
}

/// POST /submit_avaliacao
/// Form-encoded legacy variant: `nome`, `email`, `celular` and flat `pergunta_<n>` fields.
pub async fn handle_submit_legacy(
    State(state): State<AppState>,
    Form(mut fields): Form<HashMap<String, String>>,
) -> Result<Json<SubmitAssessmentResponse>, AppError> {
    let mut take = |keys: &[&str]| keys.iter().find_map(|k| fields.remove(*k));
    let name = take(&["nome", "name"]).unwrap_or_default();
    let email = take(&["email"]).unwrap_or_default();
    let phone = take(&["celular", "phone"]);
    let payment_reference = take(&["payment_reference"]);
    // Older front-ends still post the flag; it never decides the tier.
    take(&["premium_unlocked"]);

    let answers = fields
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let req = SubmitAssessmentRequest {
        name,
        email,
        phone,
        payment_reference,
        answers,
    };
    process_submission(&state, req).map(Json)
}

/// Everything up to the response happens here, synchronously. The only
/// asynchronous step is handing the rendered report to the orchestrator.
fn process_submission(
    state: &AppState,
    req: SubmitAssessmentRequest,
) -> Result<SubmitAssessmentResponse, AppError> {
    let started = Instant::now();

    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::Validation(
            "Nome e email são obrigatórios".to_string(),
        ));
    }
    let respondent = Respondent {
        name: name.to_string(),
        email: email.to_string(),
        phone: req
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    let answers = AnswerSet::from_raw(&state.questionnaire, &req.answers)?;
    let card = score(&state.questionnaire, &answers, state.scoring);

    let payment_reference = req
        .payment_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let tier = state.premium_gate.tier_for(payment_reference, &respondent.email);
    let plan = generate_plan(&card.opportunities, tier);
    let data = ReportData::new(
        &respondent,
        &card,
        tier,
        plan,
        introduction(&card),
        Local::now(),
    );
    let html = state.renderer.render(&data)?;

    let job = DeliveryJob::new(
        Recipient {
            name: respondent.name.clone(),
            email: respondent.email.clone(),
        },
        html.clone(),
        card.overall_score,
    );
    let (job_id, delivery_status) = match state.orchestrator.submit(job) {
        Ok(id) => (Some(id), "queued"),
        Err(e) => {
            warn!(recipient = %respondent.email, error = %e, "Report not queued for delivery");
            (None, "not_queued")
        }
    };

    let processing_time_ms = started.elapsed().as_millis() as u64;
    info!(
        overall_score = card.overall_score,
        tier = ?tier,
        job_id = ?job_id,
        processing_time_ms,
        "Assessment processed"
    );

    let details = SubmissionDetails {
        categories: card.categories.len(),
        questions: answers.answer_count(),
        plan_items: data.plan.len(),
    };

    Ok(SubmitAssessmentResponse {
        success: true,
        message: "Avaliação processada com sucesso! O relatório será enviado por e-mail."
            .to_string(),
        overall_score: card.overall_score,
        overall_level: card.overall_level,
        overall_level_label: card.overall_level.label(),
        html_content: html,
        ranking: card.ranking,
        strengths: card.strengths,
        opportunities: card.opportunities,
        plan: data.plan,
        tier,
        job_id,
        delivery_status,
        processing_time_ms,
        details,
    })
}
