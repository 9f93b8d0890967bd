//! munconnect - API backend for the MUN Connect platform
//!
//! Routes translate requests into table queries through a single
//! query adapter, which targets either the hosted backend over HTTP
//! or an in-memory store.

pub mod auth;
pub mod cli;
pub mod core;
pub mod http_server;
pub mod rest_api;
