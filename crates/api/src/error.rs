use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nvenc_core::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON
/// error responses. External-process failures never pass through here;
/// they are serialized as structured failure payloads by the handlers
/// so diagnostics and timing survive.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `nvenc_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Storage(msg) => {
                    tracing::error!(error = %msg, "Storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "STORAGE_ERROR",
                        "Storage unavailable".to_string(),
                    )
                }
                CoreError::InvalidPath(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_PATH", core.to_string())
                }
                CoreError::Upload(_) => {
                    (StatusCode::BAD_REQUEST, "UPLOAD_ERROR", core.to_string())
                }
                CoreError::JobNotFound(_) => {
                    (StatusCode::NOT_FOUND, "JOB_NOT_FOUND", core.to_string())
                }
                CoreError::JobAlreadyBound(_) => {
                    (StatusCode::CONFLICT, "JOB_ALREADY_BOUND", core.to_string())
                }
                CoreError::Template(_) => {
                    (StatusCode::BAD_REQUEST, "TEMPLATE_ERROR", core.to_string())
                }
                CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string()),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
