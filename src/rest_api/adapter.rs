//! # Query Adapter
//!
//! Translates a REST-style `(method, endpoint, data, params, headers)` call
//! into a table query, runs it, and normalizes the outcome.
//!
//! A failed primary attempt gets exactly one fallback: a narrow projection
//! from the table's safe column allowlist, filtered by a single equality on
//! the most specific identifier in the raw query string.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::errors::{AdapterError, UpstreamError, UpstreamResult};
use super::parser::{AdapterRequest, Endpoint, Method, Params};
use super::query::{QueryExecutor, TableQuery};
use super::response::AdapterResult;

/// Extra headers forwarded with a call
pub type Headers = BTreeMap<String, String>;

/// Query keys that never name a record
const MODIFIER_KEYS: [&str; 6] = ["select", "order", "limit", "offset", "count", "or"];

/// Adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Safe projection per table used by the fallback attempt
    #[serde(default = "default_fallback_columns")]
    pub fallback_columns: HashMap<String, Vec<String>>,
}

fn default_fallback_columns() -> HashMap<String, Vec<String>> {
    let table = |name: &str, cols: &[&str]| {
        (
            name.to_string(),
            cols.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        )
    };

    HashMap::from([
        table("profiles", &["id", "username", "full_name", "avatar_url"]),
        table("documents", &["id", "title", "author_id", "is_public"]),
        table("speeches", &["id", "title", "author_id", "is_public"]),
        table("committees", &["id", "name", "topic", "conference_name"]),
    ])
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fallback_columns: default_fallback_columns(),
        }
    }
}

impl AdapterConfig {
    /// Allowlist for `table`; unknown tables only expose `id`
    pub fn columns_for(&self, table: &str) -> Vec<String> {
        self.fallback_columns
            .get(table)
            .filter(|cols| !cols.is_empty())
            .cloned()
            .unwrap_or_else(|| vec!["id".to_string()])
    }
}

/// The request-translation layer in front of the hosted backend
#[derive(Clone)]
pub struct QueryAdapter {
    executor: Arc<dyn QueryExecutor>,
    config: AdapterConfig,
}

impl QueryAdapter {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: AdapterConfig) -> Self {
        Self { executor, config }
    }

    /// Adapter with the default fallback allowlists
    pub fn with_executor(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::new(executor, AdapterConfig::default())
    }

    /// Translate and run one call.
    ///
    /// Invalid input fails before any executor call. Auth and rate-limit
    /// failures surface immediately; other upstream failures get one
    /// fallback attempt whose failure, if any, is what gets classified.
    pub async fn execute(
        &self,
        method: &str,
        endpoint: &str,
        data: Option<Value>,
        params: Option<&Params>,
        headers: Option<&Headers>,
    ) -> Result<AdapterResult, AdapterError> {
        let method = Method::parse(method)?;
        let parsed = Endpoint::parse(endpoint)?;
        let raw_tokens = parsed.tokens.clone();
        let request = AdapterRequest::build(method, parsed, data, params)?;
        let headers = headers.cloned().unwrap_or_default();

        let primary = primary_query(&request, &headers)?;
        let primary_err = match self.run(primary, request.count).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let classified = AdapterError::classify(&primary_err);
        if !classified.is_retryable() {
            error!(
                method = method.as_str(),
                table = %request.table_name,
                error = %classified,
                "hosted call rejected"
            );
            return Err(classified);
        }

        warn!(
            method = method.as_str(),
            table = %request.table_name,
            error = %primary_err,
            "primary hosted call failed, trying fallback"
        );

        let identifier = fallback_identifier(&raw_tokens, params);
        let Some(fallback) = self.fallback_query(&request, identifier, &headers) else {
            error!(
                method = method.as_str(),
                table = %request.table_name,
                "no identifier for fallback, surfacing primary error"
            );
            return Err(classified);
        };

        match self.run(fallback, request.count).await {
            Ok(result) => {
                info!(
                    method = method.as_str(),
                    table = %request.table_name,
                    rows = result.count(),
                    "fallback hosted call succeeded"
                );
                Ok(result)
            }
            Err(e) => {
                let classified = AdapterError::classify(&e);
                error!(
                    method = method.as_str(),
                    table = %request.table_name,
                    error = %classified,
                    "fallback hosted call failed"
                );
                Err(classified)
            }
        }
    }

    async fn run(&self, query: TableQuery, count: bool) -> UpstreamResult<AdapterResult> {
        let response = query.execute(self.executor.as_ref()).await?;

        if count {
            let n = response
                .count
                .ok_or_else(|| UpstreamError::transport("Hosted backend did not report a count"))?;
            Ok(AdapterResult::Count(n))
        } else {
            Ok(AdapterResult::Rows(response.data))
        }
    }

    /// Narrow retry: allowlisted columns, one equality, same method.
    ///
    /// Requests without an identifier are never retried, whatever the method.
    fn fallback_query(
        &self,
        request: &AdapterRequest,
        identifier: Option<(String, String)>,
        headers: &Headers,
    ) -> Option<TableQuery> {
        let (field, value) = identifier?;
        let mut query = TableQuery::table(&request.table_name).eq(field, value);

        query = match request.method {
            Method::Get => {
                let mut q = query;
                if let Some(limit) = request.limit {
                    q = q.limit(limit);
                }
                if let Some(offset) = request.offset {
                    q = q.offset(offset);
                }
                q
            }
            Method::Post => query.insert(request.payload.clone()?),
            Method::Put | Method::Patch => query.update(request.payload.clone()?),
            Method::Delete => query.delete(),
        };

        query = apply_count(query, request);
        if !query.head {
            query = query.select(self.config.columns_for(&request.table_name));
        }

        Some(with_headers(query, headers))
    }
}

fn primary_query(request: &AdapterRequest, headers: &Headers) -> Result<TableQuery, AdapterError> {
    let mut query = TableQuery::table(&request.table_name);

    if let Some(columns) = &request.select_columns {
        query = query.select(columns.iter().cloned());
    }
    for condition in &request.conditions {
        query = query.filter(condition.clone());
    }
    for group in &request.or_groups {
        query = query.or(group.clone());
    }

    query = match request.method {
        Method::Get => {
            for order in &request.order_by {
                query = query.order(order.field.clone(), order.ascending);
            }
            if let Some(limit) = request.limit {
                query = query.limit(limit);
            }
            if let Some(offset) = request.offset {
                query = query.offset(offset);
            }
            query
        }
        Method::Post => query.insert(require_payload(request)?),
        Method::Put | Method::Patch => query.update(require_payload(request)?),
        Method::Delete => query.delete(),
    };

    Ok(with_headers(apply_count(query, request), headers))
}

fn require_payload(request: &AdapterRequest) -> Result<Value, AdapterError> {
    match &request.payload {
        Some(payload @ (Value::Object(_) | Value::Array(_))) => Ok(payload.clone()),
        Some(_) => Err(AdapterError::InvalidEndpoint(format!(
            "{} payload must be an object or array",
            request.method.as_str()
        ))),
        None => Err(AdapterError::InvalidEndpoint(format!(
            "{} requires a payload",
            request.method.as_str()
        ))),
    }
}

fn apply_count(query: TableQuery, request: &AdapterRequest) -> TableQuery {
    match (request.count, request.method) {
        (false, _) => query,
        (true, Method::Get) => query.count_exact().head(),
        (true, _) => query.count_exact(),
    }
}

fn with_headers(query: TableQuery, headers: &Headers) -> TableQuery {
    headers
        .iter()
        .fold(query, |q, (name, value)| q.header(name.clone(), value.clone()))
}

/// Pick the most specific `field = literal` pair from the raw tokens.
///
/// `id` beats `*_id`, which beats any other field. Only plain values or
/// `eq.`-prefixed values qualify; the operator table is not consulted.
fn fallback_identifier(
    tokens: &[(String, String)],
    params: Option<&Params>,
) -> Option<(String, String)> {
    let candidates: Vec<(&str, &str)> = tokens
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(
            params
                .into_iter()
                .flat_map(|p| p.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        )
        .filter(|(k, _)| !k.is_empty() && !MODIFIER_KEYS.contains(k))
        .filter_map(|(k, v)| literal_equality(v).map(|lit| (k, lit)))
        .collect();

    let rank = |field: &str| match field {
        "id" => 0,
        f if f.ends_with("_id") => 1,
        _ => 2,
    };

    candidates
        .into_iter()
        .enumerate()
        .min_by_key(|(pos, (field, _))| (rank(field), *pos))
        .map(|(_, (field, literal))| (field.to_string(), literal.to_string()))
}

/// `eq.5` → `5`, `5` → `5`, `gt.5` → None
fn literal_equality(value: &str) -> Option<&str> {
    let literal = match value.split_once('.') {
        Some((head, rest))
            if !head.is_empty() && head.chars().all(|c| c.is_ascii_lowercase()) =>
        {
            if head != "eq" {
                return None;
            }
            rest
        }
        _ => value,
    };

    (!literal.is_empty()).then_some(literal)
}
