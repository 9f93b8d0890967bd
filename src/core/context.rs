//! Request Context
//!
//! What guards know about an inbound request, and what they learn.

use std::time::Instant;

use uuid::Uuid;

/// Context carried through the guard chain
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Route path as matched (used in rate-limit keys)
    pub path: String,

    /// Best-known client address
    pub client_ip: String,

    /// Raw bearer token, if the request carried one
    pub bearer: Option<String>,

    /// Set once an auth guard accepts the token
    pub identity: Option<Identity>,

    started_at: Instant,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            path: path.into(),
            client_ip: client_ip.into(),
            bearer: None,
            identity: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Require an authenticated user id
    pub fn require_user_id(&self) -> Result<&str, &'static str> {
        self.identity
            .as_ref()
            .map(|i| i.user_id.as_str())
            .ok_or("Authentication required")
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_user_id() {
        let mut ctx = RequestContext::new("/api/users/profile", "127.0.0.1");
        assert!(ctx.require_user_id().is_err());

        ctx.identity = Some(Identity::new("u1"));
        assert_eq!(ctx.require_user_id().unwrap(), "u1");
    }
}
