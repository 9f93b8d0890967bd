//! Guard Middleware
//!
//! Runs a [`GuardChain`] in front of a route and hands the resolved
//! [`Identity`] to the handler as a request extension.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, OriginalUri, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use tracing::debug;

use crate::auth::bearer_token;
use crate::core::{GuardChain, Identity, RequestContext};

use super::errors::ApiError;
use super::state::AppState;

/// Wrap `route` so `chain` runs before its handler
pub fn guarded(route: MethodRouter<AppState>, chain: GuardChain) -> MethodRouter<AppState> {
    if chain.is_empty() {
        return route;
    }
    route.route_layer(middleware::from_fn_with_state(chain, enforce))
}

async fn enforce(State(chain): State<GuardChain>, mut request: Request, next: Next) -> Response {
    let mut ctx = context_for(&request);

    if let Err(e) = chain.run(&mut ctx).await {
        debug!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            elapsed_ms = ctx.elapsed_ms() as u64,
            error = %e,
            "guard rejected request"
        );
        return ApiError::from(e).into_response();
    }

    if let Some(identity) = ctx.identity.take() {
        request.extensions_mut().insert::<Identity>(identity);
    }
    next.run(request).await
}

fn context_for(request: &Request) -> RequestContext {
    // Nested routers strip their prefix from the request URI itself
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|u| u.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    RequestContext::new(path, client_ip(request)).with_bearer(bearer)
}

/// Socket peer, then the first `x-forwarded-for` hop, then "unknown"
pub fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_ip_sources() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");

        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&request), "192.0.2.1");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }

    #[test]
    fn test_context_reads_bearer() {
        let request = Request::builder()
            .uri("/api/users/profile")
            .header("authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();

        let ctx = context_for(&request);
        assert_eq!(ctx.path, "/api/users/profile");
        assert_eq!(ctx.bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn test_context_uses_concrete_path() {
        let mut request = Request::builder()
            .uri("/profile/alice")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(OriginalUri("/api/users/profile/alice".parse().unwrap()));

        let ctx = context_for(&request);
        assert_eq!(ctx.path, "/api/users/profile/alice");

        let other = Request::builder()
            .uri("/api/users/profile/bob")
            .body(Body::empty())
            .unwrap();
        assert_ne!(context_for(&other).path, ctx.path);
    }
}
