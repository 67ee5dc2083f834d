//! Typed field values consumed and produced by the template engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// Ordered mapping of key name to field value.
///
/// A `BTreeMap` keeps iteration deterministic, which matters for error
/// messages and for comparing round-tripped field sets in tests.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single value bound to a template key.
///
/// Values are typed so that keys can validate and format them per kind.
/// `Frame` stands for an unresolved frame-number placeholder in sequence
/// paths (rendered as `####` at the key's configured width).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Frame,
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Frame => "frame placeholder",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert a JSON scalar (from configuration defaults/choices) into a
    /// field value. Returns `None` for non-scalar JSON.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Frame => write!(f, "#"),
            Self::Timestamp(t) => write!(f, "{t}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
