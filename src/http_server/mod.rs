//! # MUN Connect HTTP Server Module
//!
//! Axum server exposing the MUN Connect API on top of the query adapter.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/auth/*` - Registration, login, token refresh, current user
//! - `/api/users/*` - Profiles and profile search
//! - `/api/documents/*`, `/api/speeches/*` - Author-owned content
//! - `/api/committees/*` - Committee catalogue

pub mod auth_routes;
pub mod config;
pub mod content_routes;
pub mod errors;
pub mod guard;
pub mod pagination;
pub mod profiles;
pub mod server;
pub mod state;
pub mod user_routes;
pub mod validation;

pub use config::{AppConfig, ConfigError, ConfigResult, HttpServerConfig};
pub use errors::{ApiError, ApiResult};
pub use server::{build_router, HttpServer};
pub use state::AppState;
