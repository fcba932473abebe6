//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use wallboard_shared::WallboardError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Validation errors
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("{0}")]
    IllegalTransition(String),

    // Resource errors
    #[error("Agent not found")]
    NotFound,
    #[error("Agent code already exists: {0}")]
    Conflict(String),

    // Internal errors
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::InvalidStatus(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATUS", self.to_string())
            }
            ApiError::IllegalTransition(msg) => {
                (StatusCode::BAD_REQUEST, "ILLEGAL_TRANSITION", msg.clone())
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", self.to_string()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<WallboardError> for ApiError {
    fn from(err: WallboardError) -> Self {
        match err {
            WallboardError::NotFound => ApiError::NotFound,
            WallboardError::DuplicateCode(code) => ApiError::Conflict(code),
            WallboardError::InvalidStatus(status) => ApiError::InvalidStatus(status),
            WallboardError::IllegalTransition { .. } => {
                ApiError::IllegalTransition(err.to_string())
            }
            WallboardError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
