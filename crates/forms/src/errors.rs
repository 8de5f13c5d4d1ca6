use std::fmt;

use thiserror::Error;

use dashkit_client::{ServerMessage, TransportError};

use crate::FormatError;

/// Why an accepted submit did not save.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl SubmitError {
    /// Short plain-text message for notifications.
    pub fn summary(&self) -> String {
        match self {
            SubmitError::Transport(err) => match err.server_message() {
                Some(message) => message.first().map(str::to_string).unwrap_or_else(|| err.to_string()),
                None => err.to_string(),
            },
            SubmitError::Format(err) => err.to_string(),
        }
    }
}

/// Form-wide error banner content. Separate from per-field errors.
///
/// The markup is rendered as-is, so list messages arrive pre-formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootError {
    pub markup: String,
}

impl RootError {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

impl fmt::Display for RootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup)
    }
}

/// `<ul>` with one circle-styled `<li>` per message.
pub fn format_error_list(messages: &[String]) -> String {
    let items: String = messages
        .iter()
        .map(|m| format!(r#"<li style="list-style: circle">{m}</li>"#))
        .collect();
    format!("<ul>{items}</ul>")
}

pub fn root_error_for(err: &SubmitError) -> RootError {
    let markup = match err {
        SubmitError::Transport(transport) => match transport.server_message() {
            Some(ServerMessage::Many(list)) => format_error_list(&list),
            Some(ServerMessage::One(message)) => message,
            None => transport.to_string(),
        },
        SubmitError::Format(format) => format.to_string(),
    };
    RootError::new(markup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(body: serde_json::Value) -> SubmitError {
        SubmitError::Transport(TransportError::Status { status: 422, body })
    }

    #[test]
    fn list_markup() {
        assert_eq!(
            format_error_list(&["A".into(), "B".into()]),
            r#"<ul><li style="list-style: circle">A</li><li style="list-style: circle">B</li></ul>"#
        );
    }

    #[test]
    fn array_message_becomes_two_item_list() {
        let root = root_error_for(&status(json!({"message": ["Name taken", "Email taken"]})));
        assert_eq!(root.markup.matches("<li").count(), 2);
        assert!(root.markup.starts_with("<ul>"));
    }

    #[test]
    fn string_message_and_error_field() {
        assert_eq!(root_error_for(&status(json!({"message": "Nope"}))).markup, "Nope");
        assert_eq!(root_error_for(&status(json!({"error": "Bad Request"}))).markup, "Bad Request");
    }

    #[test]
    fn transport_message_is_the_fallback() {
        let root = root_error_for(&SubmitError::Transport(TransportError::Network(
            "connection refused".into(),
        )));
        assert_eq!(root.to_string(), "network error: connection refused");
    }

    #[test]
    fn summary_uses_first_message() {
        let err = status(json!({"message": ["Name taken", "Email taken"]}));
        assert_eq!(err.summary(), "Name taken");
        assert_eq!(status(json!({})).summary(), "request failed with status code 422");
    }
}
