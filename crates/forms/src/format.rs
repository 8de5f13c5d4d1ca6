//! Field formatters: turn validated values into the outgoing payload.
//!
//! Each configured field goes through its formatter, which may rewrite the
//! value, omit it (`Ok(None)`), or append extra parts to the payload. Fields
//! without a formatter are appended as-is. The payload is multipart as soon as
//! any part is a file, JSON otherwise.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use dashkit_client::{PartValue, Payload};

use crate::{FieldValue, FormValues};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot format field `{field}`: {message}")]
pub struct FormatError {
    pub field: String,
    pub message: String,
}

impl FormatError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered parts accumulated while formatting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadBuilder {
    parts: Vec<(String, FieldValue)>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.parts.push((name.into(), value.into()));
    }

    pub fn has_file(&self) -> bool {
        self.parts.iter().any(|(_, v)| v.is_file())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Multipart when any part is a file. As JSON, repeated `name[]` parts
    /// collect into an array under `name`.
    pub fn build(self) -> Payload {
        if self.has_file() {
            let parts = self
                .parts
                .into_iter()
                .map(|(name, value)| {
                    let part = match value {
                        FieldValue::File(file) => PartValue::File(file),
                        FieldValue::Json(v) => PartValue::from_json(&v),
                    };
                    (name, part)
                })
                .collect();
            return Payload::Multipart(parts);
        }

        let mut body = Map::new();
        for (name, value) in self.parts {
            let FieldValue::Json(value) = value else { continue };
            match name.strip_suffix("[]") {
                Some(list) => match body.entry(list.to_string()).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(items) => items.push(value),
                    slot => *slot = Value::Array(vec![slot.take(), value]),
                },
                None => {
                    body.insert(name, value);
                }
            }
        }
        Payload::Json(Value::Object(body))
    }
}

pub trait FieldFormatter: Send + Sync {
    fn format(
        &self,
        key: &str,
        value: FieldValue,
        payload: &mut PayloadBuilder,
    ) -> Result<Option<FieldValue>, FormatError>;
}

impl<F> FieldFormatter for F
where
    F: Fn(&str, FieldValue, &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> + Send + Sync,
{
    fn format(
        &self,
        key: &str,
        value: FieldValue,
        payload: &mut PayloadBuilder,
    ) -> Result<Option<FieldValue>, FormatError> {
        self(key, value, payload)
    }
}

/// Per-field formatters, keyed by field name.
#[derive(Clone, Default)]
pub struct FormatterPipeline {
    formatters: BTreeMap<String, Arc<dyn FieldFormatter>>,
}

impl fmt::Debug for FormatterPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterPipeline")
            .field("fields", &self.formatters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FormatterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, formatter: impl FieldFormatter + 'static) -> Self {
        self.formatters.insert(key.into(), Arc::new(formatter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    pub fn apply(&self, values: FormValues) -> Result<Payload, FormatError> {
        let mut payload = PayloadBuilder::new();

        for (key, value) in values {
            match self.formatters.get(&key) {
                Some(formatter) => {
                    if let Some(formatted) = formatter.format(&key, value, &mut payload)? {
                        payload.append(key, formatted);
                    }
                }
                None => payload.append(key, value),
            }
        }

        Ok(payload.build())
    }
}

/// Keeps the value only when it is a file (optional attachments).
#[derive(Debug, Clone, Copy, Default)]
pub struct Attachment;

pub fn attachment() -> Attachment {
    Attachment
}

impl FieldFormatter for Attachment {
    fn format(&self, _: &str, value: FieldValue, _: &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> {
        Ok(value.is_file().then_some(value))
    }
}

/// Only `"1"` and `1` become `true`; anything else, including `true` and
/// `"true"`, becomes `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanFlag;

pub fn boolean_flag() -> BooleanFlag {
    BooleanFlag
}

impl FieldFormatter for BooleanFlag {
    fn format(&self, _: &str, value: FieldValue, _: &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> {
        let on = match value.as_json() {
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_f64() == Some(1.0),
            _ => false,
        };
        Ok(Some(FieldValue::Json(Value::Bool(on))))
    }
}

/// An object of booleans becomes one `target[]` part per key set to `true`.
/// The field itself is omitted.
#[derive(Debug, Clone)]
pub struct CheckedKeys {
    target: String,
}

pub fn checked_keys(target: impl Into<String>) -> CheckedKeys {
    CheckedKeys {
        target: format!("{}[]", target.into()),
    }
}

impl FieldFormatter for CheckedKeys {
    fn format(&self, key: &str, value: FieldValue, payload: &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> {
        let Some(Value::Object(map)) = value.as_json() else {
            return Err(FormatError::new(key, "expected an object of flags"));
        };
        for (name, flag) in map {
            if flag == &Value::Bool(true) {
                payload.append(self.target.clone(), name.as_str());
            }
        }
        Ok(None)
    }
}

/// An object becomes one JSON-encoded `target[]` part per entry that is not
/// `false`. The field itself is omitted.
#[derive(Debug, Clone)]
pub struct JsonEach {
    target: String,
}

pub fn json_each(target: impl Into<String>) -> JsonEach {
    JsonEach {
        target: format!("{}[]", target.into()),
    }
}

impl FieldFormatter for JsonEach {
    fn format(&self, key: &str, value: FieldValue, payload: &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> {
        let Some(Value::Object(map)) = value.as_json() else {
            return Err(FormatError::new(key, "expected an object"));
        };
        for entry in map.values() {
            if entry != &Value::Bool(false) {
                payload.append(self.target.clone(), FieldValue::Json(Value::String(entry.to_string())));
            }
        }
        Ok(None)
    }
}

/// Never sends the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Omit;

pub fn omit() -> Omit {
    Omit
}

impl FieldFormatter for Omit {
    fn format(&self, _: &str, _: FieldValue, _: &mut PayloadBuilder) -> Result<Option<FieldValue>, FormatError> {
        Ok(None)
    }
}
