//! Query filters.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;

use crate::document::{compare_values, get_path, values_equal, Document};
use crate::index::encode_primary;

/// A predicate over documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals value. A missing field equals `null`.
    Eq { field: String, value: Value },
    /// Field is greater than value.
    Gt { field: String, value: Value },
    /// Field equals one of the values.
    In { field: String, values: ValueSet },
    /// Field is an array with at least one element.
    NotEmpty { field: String },
    /// All sub-filters match.
    And(Vec<Filter>),
}

/// Candidate values of an `In` filter.
///
/// Membership is a hash probe on the index encoding of the value, so
/// numbers match across integer and float representations.
#[derive(Debug, Clone)]
pub struct ValueSet {
    values: Vec<Value>,
    keys: HashSet<Vec<u8>>,
}

impl ValueSet {
    fn new(values: Vec<Value>) -> Self {
        let keys = values.iter().map(encode_primary).collect();
        Self { values, keys }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.keys.contains(&encode_primary(value))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            field: field.into(),
            values: ValueSet::new(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn not_empty(field: impl Into<String>) -> Self {
        Filter::NotEmpty {
            field: field.into(),
        }
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => match get_path(doc, field) {
                Some(v) => values_equal(v, value),
                None => value.is_null(),
            },
            Filter::Gt { field, value } => get_path(doc, field)
                .map(|v| compare_values(v, value) == Ordering::Greater)
                .unwrap_or(false),
            Filter::In { field, values } => {
                values.contains(get_path(doc, field).unwrap_or(&Value::Null))
            }
            Filter::NotEmpty { field } => matches!(
                get_path(doc, field),
                Some(Value::Array(items)) if !items.is_empty()
            ),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }

    /// Values the field is constrained to by equality, if any.
    ///
    /// Only top-level `Eq`/`In` terms (or those directly under `And`) are
    /// considered, which is what index selection needs.
    pub(crate) fn equality_values(&self, target: &str) -> Option<Vec<Value>> {
        match self {
            Filter::Eq { field, value } if field == target => Some(vec![value.clone()]),
            Filter::In { field, values } if field == target => Some(values.values().to_vec()),
            Filter::And(filters) => filters.iter().find_map(|f| f.equality_values(target)),
            _ => None,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(status: &str, likes: Value) -> Document {
        match json!({"_id": 1, "status": status, "likes": likes, "views": 10}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_eq_and_not_empty() {
        let filter = Filter::And(vec![Filter::eq("status", "active"), Filter::not_empty("likes")]);
        assert!(filter.matches(&post("active", json!([{"user_id": 2}]))));
        assert!(!filter.matches(&post("active", json!([]))));
        assert!(!filter.matches(&post("draft", json!([{"user_id": 2}]))));
    }

    #[test]
    fn test_missing_field_semantics() {
        let d = post("active", json!([]));
        assert!(Filter::eq("missing", Value::Null).matches(&d));
        assert!(!Filter::gt("missing", 0).matches(&d));
        assert!(Filter::is_in("missing", [Value::Null]).matches(&d));
    }

    #[test]
    fn test_in_and_range() {
        let d = post("archived", json!([]));
        assert!(Filter::is_in("status", ["archived", "draft"]).matches(&d));
        assert!(!Filter::is_in("status", ["active"]).matches(&d));
        assert!(Filter::gt("views", 5).matches(&d));
        assert!(!Filter::gt("views", 10).matches(&d));
    }

    #[test]
    fn test_in_matches_numbers_across_representations() {
        let mut d = post("active", json!([]));
        d.insert("_id".into(), json!(7.0));
        assert!(Filter::is_in("_id", [3, 7, 9]).matches(&d));
        assert!(!Filter::is_in("_id", [3, 9]).matches(&d));
    }

    #[test]
    fn test_in_over_many_values() {
        let ids: Vec<i64> = (0..30_000).collect();
        let filter = Filter::is_in("post_id", ids.iter().copied());
        let Filter::In { values, .. } = &filter else {
            unreachable!()
        };
        assert_eq!(values.len(), 30_000);

        let hits = (0..60_000)
            .filter(|id| {
                let doc = json!({"post_id": id});
                filter.matches(doc.as_object().unwrap())
            })
            .count();
        assert_eq!(hits, 30_000);
    }

    #[test]
    fn test_equality_values_through_and() {
        let filter = Filter::And(vec![Filter::eq("status", "active"), Filter::gt("views", 1)]);
        assert_eq!(filter.equality_values("status"), Some(vec![json!("active")]));
        assert_eq!(filter.equality_values("views"), None);
    }
}
