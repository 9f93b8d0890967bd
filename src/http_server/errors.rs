//! API Errors
//!
//! Route-facing error type. Renders as
//! `{"error": {"code": "...", "message": "..."}}` with a matching status.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::core::CoreError;
use crate::rest_api::AdapterError;

/// Result type for route handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{0}")]
    RateLimited(String),

    /// Hosted backend failure passed through with its status
    #[error("{1}")]
    Upstream(u16, String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(code, _) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationFailed(_) => "validation_failed",
            ApiError::RateLimited(_) => "rate_limit_exceeded",
            ApiError::Upstream(_, _) => "upstream_error",
            ApiError::Internal(_) => "internal_server_error",
        }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unauthorized => ApiError::Unauthorized(err.to_string()),
            AdapterError::Forbidden => ApiError::Forbidden(err.to_string()),
            AdapterError::RateLimited => ApiError::RateLimited(err.to_string()),
            AdapterError::InvalidEndpoint(reason) => ApiError::BadRequest(reason),
            AdapterError::UpstreamFailure(409, message) => ApiError::Conflict(message),
            AdapterError::UpstreamFailure(404, message) => ApiError::NotFound(message),
            AdapterError::UpstreamFailure(status, message) => ApiError::Upstream(status, message),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => ApiError::ValidationFailed(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited(message),
            500 => ApiError::Internal(message),
            status => ApiError::Upstream(status, message),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthRequired(msg) => ApiError::Unauthorized(msg),
            CoreError::AccessDenied(msg) => ApiError::Forbidden(msg),
            CoreError::RateLimited(msg) => ApiError::RateLimited(msg),
            CoreError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::Conflict("Username already taken".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "conflict");
        assert_eq!(body["error"]["message"], "Username already taken");
    }

    #[tokio::test]
    async fn test_validation_failure_is_unprocessable() {
        let err = ApiError::ValidationFailed("Username too short".into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "validation_failed");
    }

    #[test]
    fn test_codes_are_snake_case() {
        let cases = [
            (ApiError::BadRequest(String::new()), "bad_request"),
            (ApiError::Unauthorized(String::new()), "unauthorized"),
            (ApiError::Forbidden(String::new()), "forbidden"),
            (ApiError::NotFound(String::new()), "not_found"),
            (ApiError::Conflict(String::new()), "conflict"),
            (ApiError::RateLimited(String::new()), "rate_limit_exceeded"),
            (ApiError::Internal(String::new()), "internal_server_error"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_adapter_mapping() {
        assert_eq!(
            ApiError::from(AdapterError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(AdapterError::UpstreamFailure(409, "dup".into())),
            ApiError::Conflict("dup".into())
        );
        assert_eq!(
            ApiError::from(AdapterError::UpstreamFailure(503, "down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(AdapterError::InvalidEndpoint("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_and_guard_mapping() {
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::EmailAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CoreError::access_denied("no")),
            ApiError::Forbidden("no".into())
        );
    }
}
