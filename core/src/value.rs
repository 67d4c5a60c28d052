//! Model-side value vocabulary.
//!
//! # Design
//! `Value` is the typed scalar/structure a model field holds; `FieldValue`
//! wraps it in the three-state optional (absent / explicit null / present)
//! so that "never loaded" and "deliberately cleared" stay distinguishable
//! all the way to a partial-update request.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// A typed model value.
///
/// Timestamps are timezone-aware instants; on the wire they travel as
/// ISO-8601 strings. Nested lists and maps are codec'd recursively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Value {
        Value::Timestamp(ts)
    }
}

/// The three-state optional for a record field.
///
/// `Absent` means the field was never loaded or set — it is skipped when
/// encoding. `ExplicitNull` means the caller (or the wire) deliberately set
/// the field to null, which on an update request clears it server-side.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Absent,
    ExplicitNull,
    Present(Value),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// True when the field carries wire-visible state (a value or an
    /// explicit null).
    pub fn is_set(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Present(v) => Some(v),
            _ => None,
        }
    }
}

/// Declared type of a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    Timestamp,
    List,
    Map,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Str => "string",
            FieldType::Int => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::List => "list",
            FieldType::Map => "map",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_default_is_absent() {
        assert_eq!(FieldValue::default(), FieldValue::Absent);
    }

    #[test]
    fn explicit_null_is_set_but_has_no_value() {
        let fv = FieldValue::ExplicitNull;
        assert!(fv.is_set());
        assert!(fv.as_value().is_none());
    }

    #[test]
    fn present_exposes_inner_value() {
        let fv = FieldValue::Present(Value::Int(7));
        assert_eq!(fv.as_value(), Some(&Value::Int(7)));
    }
}
