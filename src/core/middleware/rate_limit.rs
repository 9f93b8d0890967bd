//! Rate-Limit Guard
//!
//! Fixed one-minute window per client address and route path.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::core::context::RequestContext;
use crate::core::error::CoreError;
use crate::core::rate_store::RateLimitStore;

use super::{Guard, GuardFuture};

const WINDOW: Duration = Duration::from_secs(60);

/// Allows `limit_per_minute` requests per client and path
pub struct RateLimit {
    store: Arc<dyn RateLimitStore>,
    limit_per_minute: u64,
}

impl RateLimit {
    pub fn new(store: Arc<dyn RateLimitStore>, limit_per_minute: u64) -> Self {
        Self {
            store,
            limit_per_minute,
        }
    }

    pub fn key(ctx: &RequestContext) -> String {
        format!("rate_limit:{}:{}", ctx.client_ip, ctx.path)
    }
}

impl Guard for RateLimit {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext) -> GuardFuture<'a> {
        Box::pin(async move {
            let key = Self::key(ctx);
            if self
                .store
                .increment_below(&key, self.limit_per_minute, WINDOW)?
            {
                return Ok(());
            }

            warn!(key = %key, limit = self.limit_per_minute, "rate limit exceeded");
            Err(CoreError::RateLimited(format!(
                "Rate limit of {} requests per minute exceeded",
                self.limit_per_minute
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate_store::InMemoryRateStore;

    #[tokio::test]
    async fn test_limit_enforced_per_key() {
        let store = Arc::new(InMemoryRateStore::new());
        let guard = RateLimit::new(store.clone(), 2);
        let mut ctx = RequestContext::new("/api/users/profiles", "10.0.0.1");

        assert!(guard.check(&mut ctx).await.is_ok());
        assert!(guard.check(&mut ctx).await.is_ok());
        assert_eq!(
            guard.check(&mut ctx).await.unwrap_err(),
            CoreError::RateLimited("Rate limit of 2 requests per minute exceeded".into())
        );

        let mut other_ip = RequestContext::new("/api/users/profiles", "10.0.0.2");
        assert!(guard.check(&mut other_ip).await.is_ok());

        assert_eq!(
            store.get("rate_limit:10.0.0.1:/api/users/profiles").unwrap(),
            Some(2)
        );
    }
}
