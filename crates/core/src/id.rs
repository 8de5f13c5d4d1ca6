//! Identifiers of remote entities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of an entity as returned by the API.
///
/// Backends hand out either numeric or string keys, so both are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Interpret a JSON value as an identifier.
    ///
    /// `null`, empty strings, booleans, floats and containers are not identifiers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EntityId::Number),
            Value::String(s) if !s.is_empty() => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Number(n) => Value::from(*n),
            EntityId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
