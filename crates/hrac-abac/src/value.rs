//! Attribute values.
//!
//! Record fields and resolved user attributes are both expressed as
//! [`Value`]. Literal rule operands arrive as text and are coerced to the
//! type of the field they are compared against.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A typed attribute value.
///
/// Variant order matters for untagged deserialization: ISO dates are tried
/// before falling back to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (a nullable field with no value).
    Null,
    Bool(bool),
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Date(_) => "date",
            Value::Text(_) => "text",
        }
    }

    /// Converts `operand` to this value's type so the two can be compared.
    ///
    /// Returns `None` when the operand cannot be represented in this type
    /// (e.g. `"abc"` against an integer field). A `Null` receiver has no type
    /// to coerce to and returns the operand unchanged.
    pub fn coerce_operand(&self, operand: &Value) -> Option<Value> {
        match (self, operand) {
            (Value::Null, other) => Some(other.clone()),
            (_, Value::Null) => Some(Value::Null),
            (Value::Bool(_), Value::Bool(b)) => Some(Value::Bool(*b)),
            (Value::Int(_), Value::Int(i)) => Some(Value::Int(*i)),
            (Value::Date(_), Value::Date(d)) => Some(Value::Date(*d)),
            (Value::Text(_), Value::Text(s)) => Some(Value::Text(s.clone())),

            (Value::Int(_), Value::Text(s)) => s.trim().parse().ok().map(Value::Int),
            (Value::Bool(_), Value::Text(s)) => parse_bool(s.trim()).map(Value::Bool),
            (Value::Date(_), Value::Text(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            (Value::Text(_), other) => other.as_text().map(Value::Text),

            _ => None,
        }
    }

    /// Compares two values of the same type.
    ///
    /// Returns `None` if either side is `Null` or the types differ. Callers
    /// coerce with [`coerce_operand`](Self::coerce_operand) first.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Text form used by substring operators. `Null` has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }

    /// Converts a JSON scalar. Arrays, objects and non-integral numbers have
    /// no attribute representation.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
            serde_json::Value::String(s) => Some(
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_or_else(|_| Value::Text(s.clone()), Value::Date),
            ),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(Value::Null, Value::Int)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Value::Int(0), "42", Some(Value::Int(42)) ; "int from text")]
    #[test_case(Value::Int(0), " 7 ", Some(Value::Int(7)) ; "int trims whitespace")]
    #[test_case(Value::Int(0), "abc", None ; "int rejects garbage")]
    #[test_case(Value::Bool(false), "True", Some(Value::Bool(true)) ; "bool case insensitive")]
    #[test_case(Value::Bool(false), "maybe", None ; "bool rejects garbage")]
    #[test_case(Value::Text(String::new()), "x", Some(Value::from("x")) ; "text passthrough")]
    fn test_coerce_text_operand(field: Value, literal: &str, expected: Option<Value>) {
        assert_eq!(field.coerce_operand(&Value::from(literal)), expected);
    }

    #[test]
    fn test_coerce_date() {
        let field = Value::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(
            field.coerce_operand(&Value::from("2025-06-30")),
            Some(Value::Date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()))
        );
        assert_eq!(field.coerce_operand(&Value::from("30/06/2025")), None);
    }

    #[test]
    fn test_coerce_int_into_text_field() {
        let field = Value::from("12");
        assert_eq!(field.coerce_operand(&Value::Int(12)), Some(Value::from("12")));
    }

    #[test]
    fn test_compare_same_types() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(
            Value::from("b").compare(&Value::from("a")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compare_null_or_mixed_is_none() {
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).compare(&Value::Null), None);
        assert_eq!(Value::Int(1).compare(&Value::from("1")), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            Value::from_json(&serde_json::json!(5)),
            Some(Value::Int(5))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("2024-02-29")),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()))
        );
        assert_eq!(
            Value::from_json(&serde_json::json!("PENDING")),
            Some(Value::from("PENDING"))
        );
        assert_eq!(Value::from_json(&serde_json::json!(1.5)), None);
        assert_eq!(Value::from_json(&serde_json::json!([1])), None);
    }

    #[test]
    fn test_untagged_deserialize_prefers_date() {
        let v: Value = serde_json::from_str("\"2025-03-01\"").unwrap();
        assert!(matches!(v, Value::Date(_)));
        let v: Value = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<u64>), Value::Null);
        assert_eq!(Value::from(Some(3_u64)), Value::Int(3));
    }
}
