use std::collections::BTreeMap;

use serde_json::Value;

use dashkit_client::FilePart;
use dashkit_core::Entity;

/// A single raw field value as produced by the input layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    File(FilePart),
}

impl FieldValue {
    pub fn null() -> Self {
        FieldValue::Json(Value::Null)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldValue::File(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FieldValue::Json(v) => Some(v),
            FieldValue::File(_) => None,
        }
    }

    /// Null, an empty string or an empty array: nothing was entered.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Json(Value::Null) => true,
            FieldValue::Json(Value::String(s)) => s.trim().is_empty(),
            FieldValue::Json(Value::Array(items)) => items.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<FilePart> for FieldValue {
    fn from(file: FilePart) -> Self {
        FieldValue::File(file)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Json(Value::String(value.to_string()))
    }
}

/// Raw values keyed by field name.
pub type FormValues = BTreeMap<String, FieldValue>;

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Every field of `item` as a form value.
pub fn values_from_entity(item: &Entity) -> FormValues {
    item.iter()
        .map(|(k, v)| (k.clone(), FieldValue::Json(v.clone())))
        .collect()
}
