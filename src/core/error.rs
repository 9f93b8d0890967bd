//! Core Error Types
//!
//! Failures raised by request guards before a handler runs.

use thiserror::Error;

/// Core module result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No valid credentials on the request
    #[error("{0}")]
    AuthRequired(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    AccessDenied(String),

    /// Per-client request budget exhausted
    #[error("{0}")]
    RateLimited(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn auth_required(msg: impl Into<String>) -> Self {
        Self::AuthRequired(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthRequired(_) => "UNAUTHORIZED",
            Self::AccessDenied(_) => "FORBIDDEN",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
