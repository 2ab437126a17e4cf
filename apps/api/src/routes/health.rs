use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "assessment-api"
    }))
}

/// GET /status
/// Delivery configuration and live counters.
pub async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pdf_timeout_secs": config.pdf_timeout.as_secs(),
        "delivery_workers": state.orchestrator.workers(),
        "queue_capacity": config.delivery_queue_capacity,
        "mail_configured": config.mail.is_some(),
        "delivery": state.orchestrator.stats(),
    }))
}
