//! # REST Adapter Errors
//!
//! Error types for the request-translation layer.

use axum::http::StatusCode;
use thiserror::Error;

/// Classified adapter failures surfaced to route handlers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Credentials rejected by the hosted backend
    #[error("Unauthorized access to hosted backend")]
    Unauthorized,

    /// Credentials valid but permission denied
    #[error("Forbidden access to hosted backend")]
    Forbidden,

    /// Hosted backend throttled the request
    #[error("Too many requests to hosted backend")]
    RateLimited,

    /// Endpoint, method or query string could not be translated
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Any other upstream failure
    #[error("Hosted backend error ({0}): {1}")]
    UpstreamFailure(u16, String),
}

impl AdapterError {
    /// Classify a raw upstream failure.
    ///
    /// The embedded status code wins; without one, the message is searched
    /// for a status token.
    pub fn classify(err: &UpstreamError) -> Self {
        let status = err.status.or_else(|| status_in_message(&err.message));

        match status {
            Some(429) => AdapterError::RateLimited,
            Some(401) => AdapterError::Unauthorized,
            Some(403) => AdapterError::Forbidden,
            other => AdapterError::UpstreamFailure(other.unwrap_or(500), err.message.clone()),
        }
    }

    /// Only generic upstream failures are worth a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::UpstreamFailure(_, _))
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdapterError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdapterError::Forbidden => StatusCode::FORBIDDEN,
            AdapterError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AdapterError::InvalidEndpoint(_) => StatusCode::BAD_REQUEST,
            AdapterError::UpstreamFailure(code, _) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Raw failure reported by a query executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    /// HTTP status, when the failure carried one
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// Failure with no status (network, decode, lock)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

/// Result type for executor calls
pub type UpstreamResult<T> = Result<T, UpstreamError>;

fn status_in_message(message: &str) -> Option<u16> {
    [429u16, 401, 403].into_iter().find(|code| {
        message
            .match_indices(&code.to_string())
            .any(|(idx, token)| {
                let before = message[..idx].chars().next_back();
                let after = message[idx + token.len()..].chars().next();
                !before.is_some_and(|c| c.is_ascii_digit())
                    && !after.is_some_and(|c| c.is_ascii_digit())
            })
    })
}
