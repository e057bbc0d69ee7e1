//! Core types shared by the configuration documents
//!
//! Machines, PLCs, sensors, backends and dashboard metrics are stored as
//! loosely typed records: whatever fields the front-end or the collector
//! supplies are kept verbatim. Only `id` (and `code` for sensors) carry
//! meaning for the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loosely typed document record (a JSON/YAML mapping).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The record's `id` field
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// The record's `id` rendered as a string, if it is a string or number.
    pub fn id_string(&self) -> Option<String> {
        self.id().and_then(value_key)
    }

    /// Whether the record's id matches `key`, comparing by value or by string
    /// form (`7` matches `"7"`).
    pub fn id_matches(&self, key: &str) -> bool {
        self.id_string().as_deref() == Some(key)
    }

    /// Optional string field accessor
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Shallow merge: top-level keys in `patch` overwrite existing ones.
    pub fn merge(&mut self, patch: Record) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = crate::ScadaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::ScadaError::InvalidInput(format!(
                "expected an object, got {}",
                type_name(&other)
            ))),
        }
    }
}

/// String form of a scalar id value. Objects, arrays and null have none.
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Find the first record whose id matches `key`.
pub fn find_by_id<'a>(records: &'a mut [Record], key: &str) -> Option<&'a mut Record> {
    records.iter_mut().find(|r| r.id_matches(key))
}

/// A machine dashboard layout: the widget placements rendered by the front-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub widgets: Vec<Record>,
    /// Any other layout-level fields (grid size, title, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
