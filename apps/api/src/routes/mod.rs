pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assessment::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/status", get(health::status_handler))
        .route("/api/v1/assessments", post(handlers::handle_submit))
        // Legacy form endpoint
        .route("/submit_avaliacao", post(handlers::handle_submit_legacy))
        .with_state(state)
}
