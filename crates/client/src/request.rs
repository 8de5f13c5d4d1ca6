//! Transport-agnostic request model.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-memory file attached to a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A single multipart field.
#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File(FilePart),
}

impl PartValue {
    /// Render a JSON value the way form-data encoding does: strings verbatim,
    /// everything else as its JSON text (`true`, `42`, `null`, `{"a":1}`).
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => PartValue::Text(s.clone()),
            other => PartValue::Text(other.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PartValue::Text(s) => Some(s),
            PartValue::File(_) => None,
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// Ordered multipart fields; names may repeat (e.g. `permissions[]`).
    Multipart(Vec<(String, PartValue)>),
}

impl Payload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart(_))
    }

    /// Whether the payload has a top-level field called `name`.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Payload::Json(Value::Object(map)) => map.contains_key(name),
            Payload::Json(_) => false,
            Payload::Multipart(parts) => parts.iter().any(|(k, _)| k == name),
        }
    }

    /// All multipart values sent under `name`, in order.
    pub fn parts(&self, name: &str) -> Vec<&PartValue> {
        match self {
            Payload::Multipart(parts) => parts
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v)
                .collect(),
            Payload::Json(_) => Vec::new(),
        }
    }
}

/// A request relative to the client's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Payload>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Payload) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Payload) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_data_text_rendering() {
        assert_eq!(PartValue::from_json(&json!("a b")).as_text(), Some("a b"));
        assert_eq!(PartValue::from_json(&json!(true)).as_text(), Some("true"));
        assert_eq!(PartValue::from_json(&json!(42)).as_text(), Some("42"));
        assert_eq!(PartValue::from_json(&json!(null)).as_text(), Some("null"));
    }

    #[test]
    fn payload_field_lookup() {
        let json = Payload::Json(json!({"name": "x"}));
        assert!(json.contains("name"));
        assert!(!json.contains("avatar"));

        let multi = Payload::Multipart(vec![
            ("permissions[]".into(), PartValue::Text("a".into())),
            ("permissions[]".into(), PartValue::Text("b".into())),
        ]);
        assert!(multi.is_multipart());
        assert_eq!(multi.parts("permissions[]").len(), 2);
    }
}
