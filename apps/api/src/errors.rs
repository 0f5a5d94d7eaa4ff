use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Extraction(e) => match e {
                ExtractionError::InvalidDocument { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_DOCUMENT")
                }
                ExtractionError::FileTooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE")
                }
                ExtractionError::WrongFileCount { .. } => {
                    (StatusCode::BAD_REQUEST, "WRONG_FILE_COUNT")
                }
                ExtractionError::UnknownPlan(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_PLAN"),
                ExtractionError::MissingCredential => {
                    (StatusCode::UNAUTHORIZED, "MISSING_CREDENTIAL")
                }
                ExtractionError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
                ExtractionError::EmptyResponse
                | ExtractionError::NotJson(_)
                | ExtractionError::UnreadableDocument => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "DOCUMENT_UNREADABLE")
                }
                ExtractionError::WrongDocumentType { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "WRONG_DOCUMENT_TYPE")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::Extraction(e @ ExtractionError::Provider(_)) => {
                tracing::error!("Provider error: {e}");
                e.to_string()
            }
            AppError::Extraction(e) => {
                tracing::warn!(code, "Extraction rejected: {e}");
                e.to_string()
            }
            AppError::Validation(msg) => msg.clone(),
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
