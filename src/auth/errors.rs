//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ==================
    // Authentication Errors
    // ==================
    /// Wrong email or password (generic - don't leak which one)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered with the identity provider
    #[error("Email already registered")]
    EmailAlreadyExists,

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// No bearer token on a protected request
    #[error("Authentication required")]
    AuthenticationRequired,

    // ==================
    // JWT Errors
    // ==================
    /// JWT token is malformed
    #[error("Malformed token")]
    MalformedToken,

    /// JWT token has expired
    #[error("Token expired")]
    TokenExpired,

    /// JWT signature is invalid
    #[error("Invalid token signature")]
    InvalidSignature,

    /// A refresh token used as an access token or vice versa
    #[error("Wrong token type: expected {0}")]
    WrongTokenType(&'static str),

    // ==================
    // Internal Errors
    // ==================
    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    /// Identity provider call failed
    #[error("Identity provider error ({0}): {1}")]
    Provider(u16, String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::WeakPassword(_) => 400,

            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::AuthenticationRequired => 401,
            AuthError::MalformedToken => 401,
            AuthError::TokenExpired => 401,
            AuthError::InvalidSignature => 401,
            AuthError::WrongTokenType(_) => 401,

            // 409 Conflict
            AuthError::EmailAlreadyExists => 409,

            // 500 Internal Server Error
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
            AuthError::Provider(status, _) => {
                if (400..600).contains(status) {
                    *status
                } else {
                    502
                }
            }
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::WrongTokenType("access").status_code(), 401);
        assert_eq!(AuthError::EmailAlreadyExists.status_code(), 409);
        assert_eq!(AuthError::HashingFailed.status_code(), 500);
        assert_eq!(AuthError::Provider(429, "slow".into()).status_code(), 429);
        assert_eq!(AuthError::Provider(0, "down".into()).status_code(), 502);
    }

    #[test]
    fn test_error_messages_do_not_leak_info() {
        // InvalidCredentials should be generic
        let err = AuthError::InvalidCredentials;
        assert!(!err.to_string().contains("password"));
        assert!(!err.to_string().contains("email"));
    }
}
