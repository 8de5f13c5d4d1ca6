//! Validation schemas.
//!
//! A schema turns raw values into the values that get submitted, or reports
//! per-field messages. Validation failures never reach the network.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use dashkit_core::Entity;

use crate::{FieldErrors, FieldValue, FormValues};

pub trait Schema: Send + Sync {
    fn validate(&self, values: &FormValues) -> Result<FormValues, FieldErrors>;
}

/// A single per-field check.
#[derive(Debug, Clone)]
pub enum FieldRule {
    Required,
    /// Minimum character count for strings, item count for arrays.
    MinLength(usize),
    MaxLength(usize),
    Email,
    Custom {
        check: fn(&FieldValue) -> bool,
        message: String,
    },
}

impl FieldRule {
    pub fn custom(check: fn(&FieldValue) -> bool, message: impl Into<String>) -> Self {
        FieldRule::Custom {
            check,
            message: message.into(),
        }
    }

    fn check(&self, field: &str, value: Option<&FieldValue>) -> Option<String> {
        let present = value.filter(|v| !v.is_blank());

        match (self, present) {
            (FieldRule::Required, None) => Some(format!("{field} is required")),
            (_, None) | (FieldRule::Required, Some(_)) => None,
            (FieldRule::MinLength(min), Some(v)) => match length(v) {
                Some(len) if len < *min => {
                    Some(format!("{field} must contain at least {min} character(s)"))
                }
                _ => None,
            },
            (FieldRule::MaxLength(max), Some(v)) => match length(v) {
                Some(len) if len > *max => {
                    Some(format!("{field} must contain at most {max} character(s)"))
                }
                _ => None,
            },
            (FieldRule::Email, Some(v)) => match v.as_json() {
                Some(Value::String(s)) if looks_like_email(s) => None,
                _ => Some("Invalid email".to_string()),
            },
            (FieldRule::Custom { check, message }, Some(v)) => {
                (!check(v)).then(|| message.clone())
            }
        }
    }
}

fn length(value: &FieldValue) -> Option<usize> {
    match value.as_json()? {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Declared fields with their rules. Undeclared fields are dropped from the
/// validated output.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: BTreeMap<String, Vec<FieldRule>>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = FieldRule>) -> Self {
        self.fields.entry(name.into()).or_default().extend(rules);
        self
    }
}

impl Schema for ObjectSchema {
    fn validate(&self, values: &FormValues) -> Result<FormValues, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut output = FormValues::new();

        for (name, rules) in &self.fields {
            let value = values.get(name);
            let messages: Vec<String> = rules.iter().filter_map(|r| r.check(name, value)).collect();

            if !messages.is_empty() {
                errors.insert(name.clone(), messages);
            } else if let Some(v) = value {
                output.insert(name.clone(), v.clone());
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(errors)
        }
    }
}

/// Fallback for forms without an explicit schema: the bound item's keys are
/// accepted as any type and nothing is rejected.
///
/// Not a real validator. Values outside the item's shape pass through as well.
#[derive(Debug, Clone, Default)]
pub struct PermissiveSchema {
    known: BTreeSet<String>,
}

impl PermissiveSchema {
    pub fn from_item(item: &Entity) -> Self {
        Self {
            known: item.keys().cloned().collect(),
        }
    }

    pub fn known_fields(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }
}

impl Schema for PermissiveSchema {
    fn validate(&self, values: &FormValues) -> Result<FormValues, FieldErrors> {
        let unknown = values.keys().filter(|k| !self.known.contains(*k)).count();
        if unknown > 0 {
            tracing::debug!(unknown, "values outside the bound item's shape passed through");
        }
        Ok(values.clone())
    }
}
