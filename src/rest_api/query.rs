//! # Table Query Builder
//!
//! Fluent, table-oriented description of one call against the hosted
//! backend, and the executor seam that runs it.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use super::errors::UpstreamResult;
use super::filter::{FilterCondition, FilterOperator, FilterSet};

/// What the query does to the table
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAction {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

impl QueryAction {
    pub fn name(&self) -> &'static str {
        match self {
            QueryAction::Select => "select",
            QueryAction::Insert(_) => "insert",
            QueryAction::Update(_) => "update",
            QueryAction::Delete => "delete",
        }
    }
}

/// Order by clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

/// A fully described table call
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub action: QueryAction,

    /// Projection (None = all columns)
    pub columns: Option<Vec<String>>,

    pub filters: FilterSet,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,

    /// Ask the executor for an exact matched/affected row count
    pub count_exact: bool,

    /// Skip row materialization; only the count is wanted
    pub head: bool,

    /// Extra headers forwarded to the hosted backend
    pub headers: BTreeMap<String, String>,
}

impl TableQuery {
    /// Start a select against `name`
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            action: QueryAction::Select,
            columns: None,
            filters: FilterSet::default(),
            order: Vec::new(),
            limit: None,
            offset: None,
            count_exact: false,
            head: false,
            headers: BTreeMap::new(),
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.columns = if columns.is_empty() || columns.iter().any(|c| c == "*") {
            None
        } else {
            Some(columns)
        };
        self
    }

    pub fn filter(mut self, condition: FilterCondition) -> Self {
        self.filters.all.push(condition);
        self
    }

    fn compare(self, field: impl Into<String>, op: FilterOperator, value: impl Into<String>) -> Self {
        self.filter(FilterCondition::new(field, op, value))
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Eq, value)
    }

    pub fn neq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Neq, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Gt, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Lt, value)
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Gte, value)
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Lte, value)
    }

    pub fn ilike(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Ilike, pattern)
    }

    pub fn cs(self, field: impl Into<String>, members: impl Into<String>) -> Self {
        self.compare(field, FilterOperator::Cs, members)
    }

    /// Add an OR-group; the row must satisfy at least one member
    pub fn or(mut self, group: Vec<FilterCondition>) -> Self {
        if !group.is_empty() {
            self.filters.any_of.push(group);
        }
        self
    }

    pub fn order(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Inclusive row range, as the hosted client's `range(from, to)`
    pub fn range(self, from: usize, to: usize) -> Self {
        self.offset(from).limit(to.saturating_sub(from) + 1)
    }

    pub fn insert(mut self, payload: Value) -> Self {
        self.action = QueryAction::Insert(payload);
        self
    }

    pub fn update(mut self, payload: Value) -> Self {
        self.action = QueryAction::Update(payload);
        self
    }

    pub fn delete(mut self) -> Self {
        self.action = QueryAction::Delete;
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    pub fn head(mut self) -> Self {
        self.head = true;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Run this query
    pub async fn execute(self, executor: &dyn QueryExecutor) -> UpstreamResult<QueryResponse> {
        executor.execute(&self).await
    }
}

/// Rows and optional count returned by an executor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub data: Vec<Map<String, Value>>,
    pub count: Option<u64>,
}

/// Boxed future returned by executors
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = UpstreamResult<QueryResponse>> + Send + 'a>>;

/// Runs table queries against some backing store
pub trait QueryExecutor: Send + Sync {
    fn execute<'a>(&'a self, query: &'a TableQuery) -> ExecFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_accumulates() {
        let q = TableQuery::table("profiles")
            .select(["id", "username"])
            .eq("country", "France")
            .ilike("username", "%al%")
            .order("username", true)
            .range(20, 39);

        assert_eq!(q.table, "profiles");
        assert_eq!(q.columns, Some(vec!["id".to_string(), "username".to_string()]));
        assert_eq!(q.filters.all.len(), 2);
        assert_eq!(q.filters.all[1].operator, FilterOperator::Ilike);
        assert_eq!(q.offset, Some(20));
        assert_eq!(q.limit, Some(20));
        assert_eq!(q.action, QueryAction::Select);
    }

    #[test]
    fn test_star_selects_everything() {
        let q = TableQuery::table("profiles").select(["*"]);
        assert_eq!(q.columns, None);
    }

    #[test]
    fn test_write_actions() {
        let q = TableQuery::table("profiles").eq("id", "1").update(json!({"bio": "x"}));
        assert_eq!(q.action.name(), "update");

        let q = TableQuery::table("profiles").eq("id", "1").delete();
        assert_eq!(q.action, QueryAction::Delete);
    }

    #[test]
    fn test_empty_or_group_ignored() {
        let q = TableQuery::table("profiles").or(Vec::new());
        assert!(q.filters.any_of.is_empty());
    }
}
