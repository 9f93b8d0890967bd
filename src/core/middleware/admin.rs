//! Admin Guard
//!
//! Allows only callers whose profile carries `is_admin = true`.

use serde_json::Value;
use tracing::warn;

use crate::core::context::RequestContext;
use crate::core::error::CoreError;
use crate::rest_api::QueryAdapter;

use super::{Guard, GuardFuture};

/// Must run after [`super::RequireAuth`]
pub struct RequireAdmin {
    adapter: QueryAdapter,
}

impl RequireAdmin {
    pub fn new(adapter: QueryAdapter) -> Self {
        Self { adapter }
    }
}

impl Guard for RequireAdmin {
    fn check<'a>(&'a self, ctx: &'a mut RequestContext) -> GuardFuture<'a> {
        Box::pin(async move {
            let user_id = ctx
                .require_user_id()
                .map_err(CoreError::auth_required)?
                .to_string();

            let endpoint = format!("/rest/v1/profiles?id=eq.{}&select=is_admin", user_id);
            let lookup = self.adapter.execute("GET", &endpoint, None, None, None).await;

            let is_admin = match lookup {
                Ok(result) => result
                    .first()
                    .and_then(|row| row.get("is_admin").and_then(Value::as_bool))
                    .unwrap_or(false),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "admin lookup failed");
                    false
                }
            };

            if is_admin {
                Ok(())
            } else {
                Err(CoreError::access_denied("Admin privileges required"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::Identity;
    use crate::rest_api::MemoryQueryExecutor;
    use serde_json::json;
    use std::sync::Arc;

    fn guard() -> RequireAdmin {
        let db = MemoryQueryExecutor::new().with_rows(
            "profiles",
            vec![
                json!({"id": "admin", "is_admin": true}),
                json!({"id": "member", "is_admin": false}),
            ],
        );
        RequireAdmin::new(QueryAdapter::with_executor(Arc::new(db)))
    }

    fn ctx_for(user: &str) -> RequestContext {
        let mut ctx = RequestContext::new("/api/committees", "ip");
        ctx.identity = Some(Identity::new(user));
        ctx
    }

    #[tokio::test]
    async fn test_admin_passes() {
        assert!(guard().check(&mut ctx_for("admin")).await.is_ok());
    }

    #[tokio::test]
    async fn test_non_admin_and_unknown_denied() {
        let guard = guard();
        for user in ["member", "ghost"] {
            let err = guard.check(&mut ctx_for(user)).await.unwrap_err();
            assert!(matches!(err, CoreError::AccessDenied(_)));
        }
    }

    #[tokio::test]
    async fn test_anonymous_needs_auth() {
        let mut ctx = RequestContext::new("/api/committees", "ip");
        let err = guard().check(&mut ctx).await.unwrap_err();
        assert!(matches!(err, CoreError::AuthRequired(_)));
    }
}
