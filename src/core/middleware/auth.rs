//! Authentication Guard
//!
//! Resolves the bearer access token into an identity.

use std::sync::Arc;

use tracing::debug;

use crate::auth::jwt::JwtManager;
use crate::core::context::{Identity, RequestContext};
use crate::core::error::CoreError;

use super::{Guard, GuardFuture};

/// Rejects requests without a valid access token
pub struct RequireAuth {
    jwt: Arc<JwtManager>,
}

impl RequireAuth {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        Self { jwt }
    }
}

impl Guard for RequireAuth {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext) -> GuardFuture<'a> {
        Box::pin(async move {
            let token = ctx
                .bearer
                .as_deref()
                .ok_or_else(|| CoreError::auth_required("Missing authorization token"))?;

            let claims = self.jwt.validate_access(token).map_err(|e| {
                debug!(request_id = %ctx.request_id, error = %e, "access token rejected");
                CoreError::auth_required(e.to_string())
            })?;

            ctx.identity = Some(Identity::new(claims.sub));
            Ok(())
        })
    }
}
