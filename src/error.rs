use thiserror::Error;

/// Error kinds surfaced by every session, telemetry and report operation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range input. Retrying unchanged will fail again.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No matching session for this owner. For the telemetry producer this
    /// means "stop polling".
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
