/// Caller-facing error kinds.
///
/// Domain failures are translated into these by the booking façade; the API
/// layer maps each variant to an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The request lost to existing state. `seats` lists the seat codes that
    /// caused the conflict, if any.
    #[error("Conflict: {message}")]
    Conflict { message: String, seats: Vec<String> },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Transient failure; the same request may be retried as-is.
    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Conflict without an associated seat list.
    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict {
            message: message.into(),
            seats: Vec::new(),
        }
    }
}
