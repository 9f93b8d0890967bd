//! # Core Module
//!
//! Request context, guard chain and the rate-limit store shared by every
//! route group.

pub mod context;
pub mod error;
pub mod middleware;
pub mod rate_store;

pub use context::{Identity, RequestContext};
pub use error::{CoreError, CoreResult};
pub use middleware::{Guard, GuardChain, RateLimit, RequireAdmin, RequireAuth};
pub use rate_store::{InMemoryRateStore, RateLimitStore};
