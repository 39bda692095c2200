//! API error types with HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use twin_anchor::{AnchorError, SealingError};
use twin_core::ValidationError;
use twin_reveal::RevealError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
            ApiError::Internal(msg) => {
                // Details stay in the log
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::Validation(v) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request validation failed".to_string(),
                serde_json::to_value(v.fields()).ok(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AnchorError> for ApiError {
    fn from(e: AnchorError) -> Self {
        match e {
            AnchorError::Validation(v) => ApiError::Validation(v),
            AnchorError::Build(b) => ApiError::Internal(b.to_string()),
        }
    }
}

impl From<RevealError> for ApiError {
    fn from(e: RevealError) -> Self {
        match e {
            RevealError::QuorumNotMet { .. } | RevealError::SelfApproval => {
                ApiError::Forbidden(e.to_string())
            }
            RevealError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RevealError::AlreadyFinal(_) => ApiError::Conflict(e.to_string()),
            RevealError::InvalidRequest(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<SealingError> for ApiError {
    fn from(e: SealingError) -> Self {
        match e {
            SealingError::NotAuthorized => ApiError::Forbidden(e.to_string()),
            SealingError::Corrupt => ApiError::BadRequest(e.to_string()),
            SealingError::Encrypt => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(e: axum::extract::rejection::JsonRejection) -> Self {
        ApiError::Validation(ValidationError::single("body", e.body_text()))
    }
}
