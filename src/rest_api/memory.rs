//! # In-Memory Query Executor
//!
//! Evaluates table queries against process-local tables. Used for tests and
//! for running the server without a hosted backend.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{UpstreamError, UpstreamResult};
use super::query::{ExecFuture, QueryAction, QueryExecutor, QueryResponse, TableQuery};

type Row = Map<String, Value>;

/// Table store keyed by table name
#[derive(Debug, Default)]
pub struct MemoryQueryExecutor {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows (non-object values are skipped)
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        if let Ok(mut tables) = self.tables.write() {
            let entry = tables.entry(table.to_string()).or_default();
            entry.extend(rows.into_iter().filter_map(|r| match r {
                Value::Object(obj) => Some(obj),
                _ => None,
            }));
        }
        self
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .map(|t| t.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn run(&self, query: &TableQuery) -> UpstreamResult<QueryResponse> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| UpstreamError::transport("Lock poisoned"))?;
        let table = tables.entry(query.table.clone()).or_default();

        let (mut rows, count) = match &query.action {
            QueryAction::Select => {
                let mut matched: Vec<Row> = table
                    .iter()
                    .filter(|r| query.filters.matches(r))
                    .cloned()
                    .collect();
                let total = matched.len() as u64;
                apply_ordering(&mut matched, query);
                (apply_pagination(matched, query), total)
            }
            QueryAction::Insert(payload) => {
                let inserted = insert_rows(table, payload)?;
                let total = inserted.len() as u64;
                (inserted, total)
            }
            QueryAction::Update(payload) => {
                let patch = payload.as_object().ok_or_else(|| {
                    UpstreamError::with_status(400, "Update payload must be an object")
                })?;
                let mut updated = Vec::new();
                for row in table.iter_mut().filter(|r| query.filters.matches(r)) {
                    for (k, v) in patch {
                        row.insert(k.clone(), v.clone());
                    }
                    updated.push(row.clone());
                }
                let total = updated.len() as u64;
                (updated, total)
            }
            QueryAction::Delete => {
                let (removed, kept): (Vec<Row>, Vec<Row>) = table
                    .drain(..)
                    .partition(|r| query.filters.matches(r));
                *table = kept;
                let total = removed.len() as u64;
                (removed, total)
            }
        };

        if let Some(columns) = &query.columns {
            for row in rows.iter_mut() {
                row.retain(|k, _| columns.contains(k));
            }
        }

        Ok(QueryResponse {
            data: if query.head { Vec::new() } else { rows },
            count: query.count_exact.then_some(count),
        })
    }
}

impl QueryExecutor for MemoryQueryExecutor {
    fn execute<'a>(&'a self, query: &'a TableQuery) -> ExecFuture<'a> {
        Box::pin(async move { self.run(query) })
    }
}

fn insert_rows(table: &mut Vec<Row>, payload: &Value) -> UpstreamResult<Vec<Row>> {
    let candidates: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut inserted = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut row = candidate
            .as_object()
            .cloned()
            .ok_or_else(|| UpstreamError::with_status(400, "Insert payload must be an object"))?;

        let id = row
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
            .clone();

        if table.iter().any(|r| r.get("id") == Some(&id)) {
            return Err(UpstreamError::with_status(
                409,
                format!("duplicate key value violates unique constraint: id={}", id),
            ));
        }

        table.push(row.clone());
        inserted.push(row);
    }

    Ok(inserted)
}

fn apply_ordering(rows: &mut [Row], query: &TableQuery) {
    if query.order.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for order in &query.order {
            let cmp = compare_values(a.get(&order.field), b.get(&order.field));
            let cmp = if order.ascending { cmp } else { cmp.reverse() };
            if cmp != std::cmp::Ordering::Equal {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
}

fn apply_pagination(rows: Vec<Row>, query: &TableQuery) -> Vec<Row> {
    rows.into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        _ => std::cmp::Ordering::Equal,
    }
}
