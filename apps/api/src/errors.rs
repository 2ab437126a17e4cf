use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::assessment::answers::AssessmentError;
use crate::report::renderer::RenderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Only synchronous, pre-response failures end up here; delivery failures never do.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Assessment(#[from] AssessmentError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Assessment(e @ AssessmentError::IncompleteInput { .. }) => {
                (StatusCode::BAD_REQUEST, "INCOMPLETE_INPUT", e.to_string())
            }
            AppError::Assessment(e) => (StatusCode::BAD_REQUEST, "INVALID_ANSWER", e.to_string()),
            AppError::Render(e) => {
                tracing::error!("Render error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROCESSING_ERROR",
                    "Erro no processamento da avaliação".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = AppError::Validation("Nome e email são obrigatórios".into());
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let incomplete = AppError::from(AssessmentError::IncompleteInput {
            expected: 50,
            missing: vec![37],
        });
        assert_eq!(incomplete.into_response().status(), StatusCode::BAD_REQUEST);

        let unknown = AppError::from(AssessmentError::UnknownQuestion("x".into()));
        assert_eq!(unknown.into_response().status(), StatusCode::BAD_REQUEST);

        let render = AppError::from(RenderError::EmptyRanking);
        assert_eq!(
            render.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
