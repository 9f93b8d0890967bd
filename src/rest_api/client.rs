//! # Hosted REST Client
//!
//! Executes table queries against the hosted backend's REST interface.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Map, Value};
use tracing::debug;

use super::errors::{UpstreamError, UpstreamResult};
use super::parser::REST_PREFIX;
use super::query::{ExecFuture, QueryAction, QueryExecutor, QueryResponse, TableQuery};

/// Credentials and base URL of the hosted backend
#[derive(Debug, Clone)]
pub struct HostedCredentials {
    pub base_url: String,
    pub service_key: String,
}

impl HostedCredentials {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.service_key.is_empty()
    }

    /// Default headers every hosted call carries
    pub fn auth_headers(&self) -> UpstreamResult<HeaderMap> {
        if !self.is_configured() {
            return Err(UpstreamError::with_status(
                401,
                "Hosted backend credentials not configured",
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.service_key)?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header_value(&format!("Bearer {}", self.service_key))?,
        );
        Ok(headers)
    }
}

/// reqwest-backed executor
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
    client: Client,
    credentials: HostedCredentials,
}

impl HttpQueryExecutor {
    pub fn new(client: Client, credentials: HostedCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn build(&self, query: &TableQuery) -> UpstreamResult<RequestBuilder> {
        let url = format!("{}{}{}", self.credentials.base_url, REST_PREFIX, query.table);

        let method = match (&query.action, query.head) {
            (QueryAction::Select, true) => Method::HEAD,
            (QueryAction::Select, false) => Method::GET,
            (QueryAction::Insert(_), _) => Method::POST,
            (QueryAction::Update(_), _) => Method::PATCH,
            (QueryAction::Delete, _) => Method::DELETE,
        };

        let mut headers = self.credentials.auth_headers()?;
        let mut prefer = Vec::new();
        if !matches!(query.action, QueryAction::Select) {
            prefer.push("return=representation");
        }
        if query.count_exact {
            prefer.push("count=exact");
        }
        if !prefer.is_empty() {
            headers.insert("prefer", header_value(&prefer.join(","))?);
        }
        for (name, value) in &query.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| UpstreamError::with_status(400, format!("Bad header {}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }

        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .query(&query_pairs(query));

        match &query.action {
            QueryAction::Insert(payload) | QueryAction::Update(payload) => {
                request = request.json(payload);
            }
            QueryAction::Select | QueryAction::Delete => {}
        }

        Ok(request)
    }

    async fn run(&self, query: &TableQuery) -> UpstreamResult<QueryResponse> {
        let request = self.build(query)?;
        debug!(table = %query.table, action = query.action.name(), "hosted query");

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::new(e.status().map(|s| s.as_u16()), e.to_string()))?;

        decode_response(response, query.head).await
    }
}

impl QueryExecutor for HttpQueryExecutor {
    fn execute<'a>(&'a self, query: &'a TableQuery) -> ExecFuture<'a> {
        Box::pin(self.run(query))
    }
}

/// Query-string pairs in PostgREST form
pub fn query_pairs(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if let Some(columns) = &query.columns {
        pairs.push(("select".to_string(), columns.join(",")));
    }
    for condition in &query.filters.all {
        pairs.push((condition.field.clone(), condition.to_param_value()));
    }
    for group in &query.filters.any_of {
        let members: Vec<String> = group.iter().map(|c| c.to_group_member()).collect();
        pairs.push(("or".to_string(), format!("({})", members.join(","))));
    }
    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.field, if o.ascending { "asc" } else { "desc" }))
            .collect();
        pairs.push(("order".to_string(), order.join(",")));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        pairs.push(("offset".to_string(), offset.to_string()));
    }

    pairs
}

async fn decode_response(response: Response, head: bool) -> UpstreamResult<QueryResponse> {
    let status = response.status();
    let count = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::with_status(status.as_u16(), body));
    }

    if head {
        return Ok(QueryResponse {
            data: Vec::new(),
            count,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::transport(e.to_string()))?;

    let data = if body.trim().is_empty() {
        Vec::new()
    } else {
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::transport(format!("Invalid JSON from backend: {}", e)))?;
        rows_from_value(value)
    };

    Ok(QueryResponse { data, count })
}

/// Normalize an array-or-object body into rows
pub fn rows_from_value(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(obj),
                _ => None,
            })
            .collect(),
        Value::Object(obj) => vec![obj],
        _ => Vec::new(),
    }
}

/// `0-24/3573` or `*/42` → total
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.parse().ok()
}

fn header_value(value: &str) -> UpstreamResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| UpstreamError::with_status(400, format!("Bad header value: {}", e)))
}
