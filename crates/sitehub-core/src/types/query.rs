//! Row filters and ordering for table reads.
//!
//! A [`Query`] is backend-neutral: the REST backend renders it as
//! gateway query parameters, the in-memory backend evaluates it directly
//! against JSON rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Neq,
    /// Membership in a list.
    In,
    /// Field is null or missing.
    IsNull,
}

impl FilterOp {
    /// Operator keyword understood by the REST gateway.
    pub fn as_gateway(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::IsNull => "is",
        }
    }
}

/// A single filter condition on a named column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Column name.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: Value,
}

impl Filter {
    /// Equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// Inequality filter.
    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Neq,
            value: value.into(),
        }
    }

    /// List membership filter.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }

    /// Null check.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::IsNull,
            value: Value::Null,
        }
    }

    /// Evaluate the filter against a JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Neq => actual != &self.value,
            FilterOp::In => self
                .value
                .as_array()
                .map(|values| values.contains(actual))
                .unwrap_or(false),
            FilterOp::IsNull => actual.is_null(),
        }
    }

    /// Render the right-hand side of a gateway query parameter.
    pub fn gateway_value(&self) -> String {
        match self.op {
            FilterOp::IsNull => "is.null".to_string(),
            FilterOp::In => {
                let items: Vec<String> = self
                    .value
                    .as_array()
                    .map(|values| values.iter().map(plain).collect())
                    .unwrap_or_default();
                format!("in.({})", items.join(","))
            }
            op => format!("{}.{}", op.as_gateway(), plain(&self.value)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A sort specification consisting of a field name and direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortField {
    /// Column name to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    /// Create a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Create an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Render as a gateway `order` parameter.
    pub fn gateway_value(&self) -> String {
        match self.direction {
            SortDirection::Asc => format!("{}.asc", self.field),
            SortDirection::Desc => format!("{}.desc", self.field),
        }
    }

    /// Compare two rows on this field.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = compare_values(
            a.get(&self.field).unwrap_or(&Value::Null),
            b.get(&self.field).unwrap_or(&Value::Null),
        );
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// A table read: filters, ordering and an optional row limit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Conditions combined with AND.
    pub filters: Vec<Filter>,
    /// Optional ordering.
    pub order: Option<SortField>,
    /// Optional row limit.
    pub limit: Option<usize>,
}

impl Query {
    /// Empty query (all rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows whose `field` equals `value`, newest first by convention.
    pub fn scoped(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new()
            .filter(Filter::eq(field, value))
            .order_by(SortField::desc("created_at"))
    }

    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: SortField) -> Self {
        self.order = Some(order);
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&y.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let row = json!({"project_id": "p1", "status": "draft", "note": null});
        assert!(Filter::eq("project_id", "p1").matches(&row));
        assert!(!Filter::eq("project_id", "p2").matches(&row));
        assert!(Filter::neq("status", "approved").matches(&row));
        assert!(Filter::is_in("status", vec![json!("draft"), json!("pending")]).matches(&row));
        assert!(Filter::is_null("note").matches(&row));
        assert!(Filter::is_null("missing").matches(&row));
    }

    #[test]
    fn test_gateway_rendering() {
        assert_eq!(Filter::eq("project_id", "p1").gateway_value(), "eq.p1");
        assert_eq!(
            Filter::is_in("status", vec![json!("a"), json!("b")]).gateway_value(),
            "in.(a,b)"
        );
        assert_eq!(Filter::is_null("x").gateway_value(), "is.null");
        assert_eq!(SortField::desc("created_at").gateway_value(), "created_at.desc");
    }

    #[test]
    fn test_descending_sort_on_timestamps() {
        let order = SortField::desc("created_at");
        let older = json!({"created_at": "2024-01-01T00:00:00Z"});
        let newer = json!({"created_at": "2024-02-01T00:00:00Z"});
        assert_eq!(order.compare(&newer, &older), Ordering::Less);
    }
}
