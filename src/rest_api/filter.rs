//! # Filter Conditions
//!
//! Comparison predicates carried by a table query, plus their in-process
//! evaluation used by the memory executor.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filter operators understood by the hosted REST backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equals
    Eq,

    /// Not equals
    Neq,

    /// Greater than
    Gt,

    /// Less than
    Lt,

    /// Greater than or equal
    Gte,

    /// Less than or equal
    Lte,

    /// Case-insensitive pattern match (`%` wildcard)
    Ilike,

    /// Array contains, value written as `{a,b}`
    Cs,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 8] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
        FilterOperator::Ilike,
        FilterOperator::Cs,
    ];

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::Ilike => "ilike",
            FilterOperator::Cs => "cs",
        }
    }

    /// Parse an operator keyword
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == s)
    }

    /// Split `op.rest` into the operator and the remainder
    pub fn strip_prefix(s: &str) -> Option<(Self, &str)> {
        let (head, rest) = s.split_once('.')?;
        Self::parse(head).map(|op| (op, rest))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `field op value` comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Render as the `op.value` right-hand side of a query parameter
    pub fn to_param_value(&self) -> String {
        format!("{}.{}", self.operator, self.value)
    }

    /// Render as a `field.op.value` member of an `or=(...)` group
    pub fn to_group_member(&self) -> String {
        format!("{}.{}.{}", self.field, self.operator, self.value)
    }

    /// Check if a row satisfies this condition
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let field_value = match row.get(&self.field) {
            Some(Value::Null) | None => return false,
            Some(v) => v,
        };

        match self.operator {
            FilterOperator::Eq => compare(field_value, &self.value) == Some(Ordering::Equal),
            FilterOperator::Neq => compare(field_value, &self.value) != Some(Ordering::Equal),
            FilterOperator::Gt => compare(field_value, &self.value) == Some(Ordering::Greater),
            FilterOperator::Lt => compare(field_value, &self.value) == Some(Ordering::Less),
            FilterOperator::Gte => matches!(
                compare(field_value, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lte => matches!(
                compare(field_value, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::Ilike => field_value
                .as_str()
                .map(|s| like_match(&s.to_lowercase(), &self.value.to_lowercase()))
                .unwrap_or(false),
            FilterOperator::Cs => {
                let Some(items) = field_value.as_array() else {
                    return false;
                };
                parse_array_literal(&self.value).iter().all(|wanted| {
                    items
                        .iter()
                        .any(|item| compare(item, wanted) == Some(Ordering::Equal))
                })
            }
        }
    }
}

/// Conditions combined with AND, plus OR-groups that must each match once
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub all: Vec<FilterCondition>,
    pub any_of: Vec<Vec<FilterCondition>>,
}

impl FilterSet {
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.all.iter().all(|c| c.matches(row))
            && self
                .any_of
                .iter()
                .all(|group| group.is_empty() || group.iter().any(|c| c.matches(row)))
    }
}

/// Compare a stored JSON value with a literal from the query string
fn compare(stored: &Value, literal: &str) -> Option<Ordering> {
    match stored {
        Value::Number(n) => {
            let a = n.as_f64()?;
            let b = literal.parse::<f64>().ok()?;
            a.partial_cmp(&b)
        }
        Value::Bool(b) => literal.parse::<bool>().ok().map(|l| b.cmp(&l)),
        Value::String(s) => Some(s.as_str().cmp(literal)),
        _ => None,
    }
}

/// Parse `{a,b,c}` into its members
fn parse_array_literal(value: &str) -> Vec<&str> {
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value);

    inner
        .split(',')
        .map(|s| s.trim().trim_matches('"'))
        .filter(|s| !s.is_empty())
        .collect()
}

/// SQL LIKE matching with `%` (any run) and `_` (one char)
fn like_match(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    let (mut vi, mut pi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while vi < v.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == v[vi]) {
            vi += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, vi));
            pi += 1;
        } else if let Some((sp, sv)) = star {
            pi = sp + 1;
            vi = sv + 1;
            star = Some((sp, sv + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_operator_prefix() {
        assert_eq!(
            FilterOperator::strip_prefix("eq.alice"),
            Some((FilterOperator::Eq, "alice"))
        );
        assert_eq!(
            FilterOperator::strip_prefix("gte.1.5"),
            Some((FilterOperator::Gte, "1.5"))
        );
        assert_eq!(FilterOperator::strip_prefix("like.x"), None);
        assert_eq!(FilterOperator::strip_prefix("alice"), None);
    }

    #[test]
    fn test_eq_on_strings_and_numbers() {
        let r = row(json!({"id": "1", "age": 21}));
        assert!(FilterCondition::eq("id", "1").matches(&r));
        assert!(FilterCondition::eq("age", "21").matches(&r));
        assert!(!FilterCondition::eq("age", "22").matches(&r));
        assert!(FilterCondition::new("id", FilterOperator::Neq, "2").matches(&r));
    }

    #[test]
    fn test_numeric_ordering() {
        let r = row(json!({"duration_seconds": 90}));
        assert!(FilterCondition::new("duration_seconds", FilterOperator::Gt, "60").matches(&r));
        assert!(FilterCondition::new("duration_seconds", FilterOperator::Lte, "90").matches(&r));
        assert!(!FilterCondition::new("duration_seconds", FilterOperator::Lt, "90").matches(&r));
    }

    #[test]
    fn test_ilike() {
        let r = row(json!({"username": "AliceSmith"}));
        assert!(FilterCondition::new("username", FilterOperator::Ilike, "%alice%").matches(&r));
        assert!(FilterCondition::new("username", FilterOperator::Ilike, "a_ice%").matches(&r));
        assert!(!FilterCondition::new("username", FilterOperator::Ilike, "%bob%").matches(&r));
    }

    #[test]
    fn test_contains() {
        let r = row(json!({"interests": ["climate", "security"]}));
        assert!(FilterCondition::new("interests", FilterOperator::Cs, "{climate}").matches(&r));
        assert!(
            FilterCondition::new("interests", FilterOperator::Cs, "{climate,security}").matches(&r)
        );
        assert!(!FilterCondition::new("interests", FilterOperator::Cs, "{trade}").matches(&r));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let r = row(json!({"id": "1"}));
        assert!(!FilterCondition::eq("username", "x").matches(&r));
        assert!(!FilterCondition::new("username", FilterOperator::Neq, "x").matches(&r));
    }

    #[test]
    fn test_filter_set_or_groups() {
        let set = FilterSet {
            all: vec![FilterCondition::eq("country", "France")],
            any_of: vec![vec![
                FilterCondition::new("username", FilterOperator::Ilike, "%jean%"),
                FilterCondition::new("full_name", FilterOperator::Ilike, "%jean%"),
            ]],
        };

        assert!(set.matches(&row(json!({
            "country": "France", "username": "pierre", "full_name": "Jean Pierre"
        }))));
        assert!(!set.matches(&row(json!({
            "country": "France", "username": "pierre", "full_name": "Pierre"
        }))));
        assert!(!set.matches(&row(json!({
            "country": "Spain", "username": "jean"
        }))));
    }
}
