//! # Endpoint Parser
//!
//! Turns `/rest/v1/{table}[/count][?tokens]` plus caller params into a
//! structured request.
//!
//! Filter tokens use one grammar: `field=op.value`. Tokens whose value does
//! not start with a known operator are skipped. The keys `select`, `order`,
//! `limit`, `offset`, `count` and `or` are modifiers, not filters.

use std::collections::BTreeMap;

use reqwest::Url;

use super::errors::AdapterError;
use super::filter::{FilterCondition, FilterOperator};
use super::query::OrderBy;

/// Path prefix of the hosted REST interface
pub const REST_PREFIX: &str = "/rest/v1/";

/// Caller-supplied query parameters
pub type Params = BTreeMap<String, String>;

/// HTTP method accepted by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn parse(method: &str) -> Result<Self, AdapterError> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(AdapterError::InvalidEndpoint(format!(
                "Unsupported method: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Table and raw query string split out of an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub table: String,
    pub count_path: bool,

    /// Decoded `key=value` pairs in the order they appeared
    pub tokens: Vec<(String, String)>,
}

impl Endpoint {
    /// Parse an endpoint string; fails on anything but `/rest/v1/{table}[/count]`
    pub fn parse(endpoint: &str) -> Result<Self, AdapterError> {
        if !endpoint.starts_with(REST_PREFIX) {
            return Err(AdapterError::InvalidEndpoint(format!(
                "Endpoint must start with {}: {}",
                REST_PREFIX, endpoint
            )));
        }

        let url = Url::parse(&format!("http://hosted.invalid{}", endpoint)).map_err(|e| {
            AdapterError::InvalidEndpoint(format!("Malformed endpoint {}: {}", endpoint, e))
        })?;

        let rest = &url.path()[REST_PREFIX.len()..];
        let segments: Vec<&str> = rest.split('/').collect();

        let (table, count_path) = match segments.as_slice() {
            [table] => (*table, false),
            [table, "count"] => (*table, true),
            [table, ""] => (*table, false),
            _ => {
                return Err(AdapterError::InvalidEndpoint(format!(
                    "Unexpected path: {}",
                    url.path()
                )))
            }
        };

        if !is_identifier(table) {
            return Err(AdapterError::InvalidEndpoint(format!(
                "Invalid table name: {:?}",
                table
            )));
        }

        let tokens = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            table: table.to_string(),
            count_path,
            tokens,
        })
    }
}

/// Structured request ready to be built into a table query
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRequest {
    pub method: Method,
    pub table_name: String,
    pub conditions: Vec<FilterCondition>,
    pub or_groups: Vec<Vec<FilterCondition>>,
    pub payload: Option<serde_json::Value>,
    pub select_columns: Option<Vec<String>>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub count: bool,
}

impl AdapterRequest {
    /// Build from a parsed endpoint and the caller's params.
    ///
    /// Endpoint tokens are applied before params.
    pub fn build(
        method: Method,
        endpoint: Endpoint,
        payload: Option<serde_json::Value>,
        params: Option<&Params>,
    ) -> Result<Self, AdapterError> {
        let mut request = AdapterRequest {
            method,
            table_name: endpoint.table,
            conditions: Vec::new(),
            or_groups: Vec::new(),
            payload,
            select_columns: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            count: endpoint.count_path,
        };

        let extra = params
            .into_iter()
            .flat_map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())));

        for (key, value) in endpoint.tokens.into_iter().chain(extra) {
            request.apply_token(&key, &value)?;
        }

        Ok(request)
    }

    fn apply_token(&mut self, key: &str, value: &str) -> Result<(), AdapterError> {
        match key {
            "select" => self.select_columns = parse_select(value),
            "order" => self.order_by.extend(parse_order(value)?),
            "limit" => self.limit = Some(parse_number("limit", value)?),
            "offset" => self.offset = Some(parse_number("offset", value)?),
            "count" => self.count = self.count || value == "exact",
            "or" => {
                let group = parse_or_group(value);
                if !group.is_empty() {
                    self.or_groups.push(group);
                }
            }
            field => {
                if let Some(condition) = parse_filter_token(field, value) {
                    self.conditions.push(condition);
                }
            }
        }
        Ok(())
    }
}

/// Parse one `field=op.value` token; unknown operators yield None
pub fn parse_filter_token(field: &str, value: &str) -> Option<FilterCondition> {
    if !is_identifier(field) {
        return None;
    }
    let (operator, literal) = FilterOperator::strip_prefix(value)?;
    Some(FilterCondition::new(field, operator, literal))
}

/// Parse `(a.eq.1,b.ilike.%x%)` into its members, skipping unknown ones
pub fn parse_or_group(value: &str) -> Vec<FilterCondition> {
    let inner = value
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or(value);

    split_top_level(inner)
        .into_iter()
        .filter_map(|member| {
            let (field, rest) = member.trim().split_once('.')?;
            parse_filter_token(field, rest)
        })
        .collect()
}

/// Split on commas that are not inside `{...}` array literals
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Parse select parameter (comma-separated column list)
fn parse_select(value: &str) -> Option<Vec<String>> {
    let columns: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if columns.is_empty() || columns.iter().any(|c| c == "*") {
        None
    } else {
        Some(columns)
    }
}

/// Parse order parameter (comma-separated field.direction)
fn parse_order(value: &str) -> Result<Vec<OrderBy>, AdapterError> {
    let mut orders = Vec::new();

    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (field, ascending) = match part.rsplit_once('.') {
            Some((field, "asc")) => (field, true),
            Some((field, "desc")) => (field, false),
            Some((_, direction)) => {
                return Err(AdapterError::InvalidEndpoint(format!(
                    "Invalid order direction: {}",
                    direction
                )))
            }
            None => (part, true),
        };

        orders.push(OrderBy {
            field: field.to_string(),
            ascending,
        });
    }

    Ok(orders)
}

fn parse_number(name: &str, value: &str) -> Result<usize, AdapterError> {
    value
        .trim()
        .parse()
        .map_err(|_| AdapterError::InvalidEndpoint(format!("Invalid {}: {}", name, value)))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_and_tokens() {
        let ep = Endpoint::parse("/rest/v1/profiles?username=eq.alice&id=neq.7").unwrap();
        assert_eq!(ep.table, "profiles");
        assert!(!ep.count_path);
        assert_eq!(
            ep.tokens,
            vec![
                ("username".to_string(), "eq.alice".to_string()),
                ("id".to_string(), "neq.7".to_string()),
            ]
        );
    }

    #[test]
    fn test_count_path() {
        let ep = Endpoint::parse("/rest/v1/profiles/count").unwrap();
        assert_eq!(ep.table, "profiles");
        assert!(ep.count_path);
    }

    #[test]
    fn test_rejects_foreign_endpoints() {
        for bad in [
            "/auth/v1/signup",
            "/rest/v2/profiles",
            "rest/v1/profiles",
            "/rest/v1/",
            "/rest/v1/profiles/1/extra",
            "/rest/v1/pro-files",
        ] {
            assert!(
                matches!(Endpoint::parse(bad), Err(AdapterError::InvalidEndpoint(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_values_are_percent_decoded() {
        let ep = Endpoint::parse("/rest/v1/profiles?full_name=ilike.%25Jean%20Luc%25").unwrap();
        let request = AdapterRequest::build(Method::Get, ep, None, None).unwrap();
        assert_eq!(request.conditions[0].value, "%Jean Luc%");
        assert_eq!(request.conditions[0].operator, FilterOperator::Ilike);
    }

    #[test]
    fn test_unknown_operators_are_ignored() {
        let ep = Endpoint::parse("/rest/v1/profiles?username=alice&id=like.1&bio=eq.x").unwrap();
        let request = AdapterRequest::build(Method::Get, ep, None, None).unwrap();
        assert_eq!(request.conditions, vec![FilterCondition::eq("bio", "x")]);
    }

    #[test]
    fn test_modifiers_from_params() {
        let ep = Endpoint::parse("/rest/v1/profiles?id=eq.1").unwrap();
        let mut params = Params::new();
        params.insert("select".into(), "id,username".into());
        params.insert("order".into(), "username.asc,created_at.desc".into());
        params.insert("limit".into(), "20".into());
        params.insert("offset".into(), "40".into());
        params.insert("count".into(), "exact".into());

        let request = AdapterRequest::build(Method::Get, ep, None, Some(&params)).unwrap();
        assert_eq!(
            request.select_columns,
            Some(vec!["id".to_string(), "username".to_string()])
        );
        assert_eq!(request.order_by.len(), 2);
        assert!(!request.order_by[1].ascending);
        assert_eq!(request.limit, Some(20));
        assert_eq!(request.offset, Some(40));
        assert!(request.count);
        assert_eq!(request.conditions.len(), 1);
    }

    #[test]
    fn test_bad_limit_is_invalid() {
        let ep = Endpoint::parse("/rest/v1/profiles?limit=ten").unwrap();
        let result = AdapterRequest::build(Method::Get, ep, None, None);
        assert!(matches!(result, Err(AdapterError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_or_group() {
        let group =
            parse_or_group("(username.ilike.%al%,full_name.ilike.%al%,interests.cs.{un,trade},x.zz.1)");
        assert_eq!(group.len(), 3);
        assert_eq!(group[2].field, "interests");
        assert_eq!(group[2].value, "{un,trade}");
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("patch").unwrap(), Method::Patch);
        assert!(matches!(
            Method::parse("OPTIONS"),
            Err(AdapterError::InvalidEndpoint(_))
        ));
    }
}
