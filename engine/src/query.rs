//! Queries over a collection: owner filters plus optional single-field order.

use crate::document::{CollectionPath, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// A single filter. Multiple filters on a query AND together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Filter {
    /// Field equals the given value.
    FieldEq { field: String, value: Value },
    /// Array field contains the given value.
    ArrayContains { field: String, value: Value },
}

impl Filter {
    /// Whether a document satisfies this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::FieldEq { field, value } => doc.field(field) == Some(value),
            Filter::ArrayContains { field, value } => doc
                .array_field(field)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field ordering. Single-field so the backend never needs a
/// composite index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Compare two documents by the ordered field. Ties are left equal;
    /// callers break them with their own stable key.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_values(a.field(&self.field), b.field(&self.field));
        match self.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_value(a, b),
        // Missing fields sort first
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_value(a: &Value, b: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return a.cmp(b);
    }
    if let (Some(a), Some(b)) = (a.as_bool(), b.as_bool()) {
        return a.cmp(&b);
    }
    Ordering::Equal
}

/// A read over one collection: path, AND-ed filters, optional order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub path: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Query every document of a collection.
    pub fn collection(path: CollectionPath) -> Self {
        Self {
            path,
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Add an equality filter.
    pub fn where_field_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::FieldEq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Add an array-contains filter.
    pub fn where_array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Order ascending by a field.
    pub fn order_by_asc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction: Direction::Ascending,
        });
        self
    }

    /// Order descending by a field.
    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction: Direction::Descending,
        });
        self
    }

    /// Whether a document satisfies every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| filter.matches(doc))
    }
}
