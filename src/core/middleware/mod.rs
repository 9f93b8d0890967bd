//! Request Guards
//!
//! Pre-condition checks run in order before a handler. Each guard may
//! enrich the context or short-circuit with a typed error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::context::RequestContext;
use super::error::CoreResult;

pub mod admin;
pub mod auth;
pub mod rate_limit;

pub use admin::RequireAdmin;
pub use auth::RequireAuth;
pub use rate_limit::RateLimit;

/// Boxed future returned by guards
pub type GuardFuture<'a> = Pin<Box<dyn Future<Output = CoreResult<()>> + Send + 'a>>;

/// One pre-condition check
pub trait Guard: Send + Sync {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext) -> GuardFuture<'a>;
}

/// Guards applied to a route group, in order
#[derive(Clone, Default)]
pub struct GuardChain {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guard
    pub fn with_guard<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Run every guard; the first failure stops the chain
    pub async fn run(&self, ctx: &mut RequestContext) -> CoreResult<()> {
        for guard in &self.guards {
            guard.check(ctx).await?;
        }
        Ok(())
    }
}
