//! # AppError
//!
//! Centralized error handling for the crumblog services.
//! Every failure a caller can observe maps to one of these variants.

use thiserror::Error;

/// The primary error type for all cl-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed or incomplete input (e.g., recipe without ingredients, rating of 7)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (e.g., Bread, Submission, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Operation not legal in the current state (e.g., moderating twice)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Actor lacks the required role or identity. Never retryable.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (e.g., duplicate username or email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    /// Short machine-readable name used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(..) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Adapters report through `anyhow`; an `AppError` they wrapped (e.g. a unique
/// constraint surfacing as `Conflict`) is recovered, anything else is `Internal`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal(format!("{other:#}")),
        }
    }
}

/// A specialized Result type for crumblog logic.
pub type Result<T> = std::result::Result<T, AppError>;
