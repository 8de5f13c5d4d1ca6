use serde_json::Value;
use thiserror::Error;

/// Failure of a request at the transport or server level.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("request failed with status code {status}")]
    Status { status: u16, body: Value },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,

    /// A 401 could not be recovered by refreshing the access token.
    #[error("session expired; please sign in again")]
    Unauthenticated,
}

/// Human-readable message supplied by the server in an error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    One(String),
    Many(Vec<String>),
}

impl ServerMessage {
    pub fn first(&self) -> Option<&str> {
        match self {
            ServerMessage::One(m) => Some(m),
            ServerMessage::Many(list) => list.first().map(String::as_str),
        }
    }
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Unauthenticated => Some(401),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            TransportError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Message from the error envelope `{ message?: string | string[], error?: string }`.
    ///
    /// `message` is preferred over `error`; empty values count as absent.
    pub fn server_message(&self) -> Option<ServerMessage> {
        let body = self.body()?;

        match body.get("message") {
            Some(Value::String(m)) if !m.is_empty() => return Some(ServerMessage::One(m.clone())),
            Some(Value::Array(items)) if !items.is_empty() => {
                let list = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                return Some(ServerMessage::Many(list));
            }
            _ => {}
        }

        match body.get("error") {
            Some(Value::String(e)) if !e.is_empty() => Some(ServerMessage::One(e.clone())),
            _ => None,
        }
    }
}
