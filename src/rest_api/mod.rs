//! # REST Adapter Module
//!
//! Translates REST-style calls onto table queries against the hosted
//! backend, with one narrow fallback retry and error classification.

pub mod adapter;
pub mod client;
pub mod errors;
pub mod filter;
pub mod memory;
pub mod parser;
pub mod query;
pub mod response;

pub use adapter::{AdapterConfig, Headers, QueryAdapter};
pub use client::{HostedCredentials, HttpQueryExecutor};
pub use errors::{AdapterError, UpstreamError, UpstreamResult};
pub use filter::{FilterCondition, FilterOperator, FilterSet};
pub use memory::MemoryQueryExecutor;
pub use parser::{AdapterRequest, Endpoint, Method, Params, REST_PREFIX};
pub use query::{ExecFuture, QueryAction, QueryExecutor, QueryResponse, TableQuery};
pub use response::AdapterResult;
