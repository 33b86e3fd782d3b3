use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cinebook_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds malformed-request errors.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `cinebook_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request body that could not be read, with the extractor's reason.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut seats: Vec<String> = Vec::new();

        let (status, code, message) = match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, key } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} {key} not found"),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
                CoreError::Conflict {
                    message,
                    seats: conflicting,
                } => {
                    seats = conflicting;
                    (StatusCode::CONFLICT, "CONFLICT", message)
                }
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
                CoreError::Unavailable(msg) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = if seats.is_empty() {
            json!({
                "error": message,
                "code": code,
            })
        } else {
            json!({
                "error": message,
                "code": code,
                "seats": seats,
            })
        };

        (status, axum::Json(body)).into_response()
    }
}
