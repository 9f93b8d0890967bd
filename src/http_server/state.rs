//! Shared Application State
//!
//! Collaborators every route group needs, built once at startup.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    HttpIdentityProvider, IdentityProvider, JwtManager, MemoryIdentityProvider,
};
use crate::core::{GuardChain, InMemoryRateStore, RateLimit, RateLimitStore, RequireAdmin, RequireAuth};
use crate::rest_api::{
    HostedCredentials, HttpQueryExecutor, MemoryQueryExecutor, QueryAdapter, QueryExecutor,
};

use super::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub adapter: QueryAdapter,
    pub identity: Arc<dyn IdentityProvider>,
    pub jwt: Arc<JwtManager>,
    pub rate_store: Arc<dyn RateLimitStore>,
    pub rate_limit_enabled: bool,
}

impl AppState {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        identity: Arc<dyn IdentityProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            adapter: QueryAdapter::new(executor, config.adapter.clone()),
            identity,
            jwt: Arc::new(JwtManager::new(config.auth.jwt_config())),
            rate_store: Arc::new(InMemoryRateStore::new()),
            rate_limit_enabled: config.rate_limit.enabled,
        }
    }

    /// State backed by the hosted backend over HTTP
    pub fn hosted(config: &AppConfig) -> Self {
        let credentials = HostedCredentials::new(&config.backend.url, &config.backend.service_key);
        if !credentials.is_configured() {
            warn!("hosted backend credentials missing; every hosted call will be rejected");
        }

        let client = reqwest::Client::new();
        info!(url = %credentials.base_url, "using hosted backend");
        Self::new(
            Arc::new(HttpQueryExecutor::new(client.clone(), credentials.clone())),
            Arc::new(HttpIdentityProvider::new(client, credentials)),
            config,
        )
    }

    /// Self-contained state for development and tests
    pub fn in_memory(config: &AppConfig) -> Self {
        info!("using in-memory backend");
        Self::new(
            Arc::new(MemoryQueryExecutor::new()),
            Arc::new(MemoryIdentityProvider::new()),
            config,
        )
    }

    // ==================
    // Guard chains
    // ==================

    /// Valid access token required
    pub fn authenticated(&self) -> GuardChain {
        GuardChain::new().with_guard(RequireAuth::new(self.jwt.clone()))
    }

    /// Access token plus admin flag required
    pub fn admin(&self) -> GuardChain {
        self.authenticated()
            .with_guard(RequireAdmin::new(self.adapter.clone()))
    }

    /// Add a per-minute limit to `chain` when limiting is enabled
    pub fn limited(&self, chain: GuardChain, per_minute: u64) -> GuardChain {
        if self.rate_limit_enabled {
            chain.with_guard(RateLimit::new(self.rate_store.clone(), per_minute))
        } else {
            chain
        }
    }
}
