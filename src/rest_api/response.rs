//! # Adapter Results
//!
//! Uniform success shape returned by the query adapter.

use serde::Serialize;
use serde_json::{Map, Value};

/// Either the rows a call produced or a bare count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdapterResult {
    Rows(Vec<Map<String, Value>>),
    Count(u64),
}

impl AdapterResult {
    /// Rows, or an empty list for a count result
    pub fn into_rows(self) -> Vec<Map<String, Value>> {
        match self {
            AdapterResult::Rows(rows) => rows,
            AdapterResult::Count(_) => Vec::new(),
        }
    }

    /// First row, if any
    pub fn first(self) -> Option<Map<String, Value>> {
        self.into_rows().into_iter().next()
    }

    /// Count, or the number of rows for a rows result
    pub fn count(&self) -> u64 {
        match self {
            AdapterResult::Rows(rows) => rows.len() as u64,
            AdapterResult::Count(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
