// HTTP error type
//
// Every failure becomes `{"error": <message>, "success": false}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::chain::ChainError;

pub const NO_JSON_MESSAGE: &str = "No JSON data provided";

pub const MISSING_CREDENTIALS_MESSAGE: &str =
    "No API key available. Please provide ANTHROPIC_API_KEY or OPENAI_API_KEY.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing body, missing fields, unknown step
    #[error("{0}")]
    Validation(String),

    /// A step number that is not a positive integer
    #[error("{0}")]
    InvalidStep(String),

    #[error("{}", MISSING_CREDENTIALS_MESSAGE)]
    MissingCredentials,

    #[error("{0}")]
    Precondition(String),

    /// The completion service failed
    #[error("{0}")]
    Service(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidStep(_)
            | ApiError::MissingCredentials
            | ApiError::Precondition(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        let stage = err.stage();
        match err {
            ChainError::Precondition { .. } => {
                tracing::warn!(stage = stage.key(), "Rejected request: {}", err);
                ApiError::Precondition(err.to_string())
            }
            ChainError::Service { .. } => {
                tracing::error!(stage = stage.key(), "Stage failed: {}", err);
                ApiError::Service(err.to_string())
            }
            ChainError::Template { .. } => {
                tracing::error!(stage = stage.key(), "Template error: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(json!({"error": self.to_string(), "success": false})),
        )
            .into_response()
    }
}
