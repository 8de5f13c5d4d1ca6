//! Response envelopes: APIs answer either `{ message?, data? }` or the bare value.

use serde_json::Value;

/// The entity carried by a response body.
///
/// Returns `body.data` when present and non-null, otherwise the whole body.
pub fn unwrap_entity(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// The list carried by a response body: `body.data` or a bare array.
///
/// Anything else yields an empty list.
pub fn unwrap_list(body: Value) -> Vec<Value> {
    match unwrap_entity(body) {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
