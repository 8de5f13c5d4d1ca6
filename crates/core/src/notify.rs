//! Transient user notifications ("toasts").
//!
//! Rendering is the host's business; this module only describes what should be
//! shown and routes it through an injected [`Notifier`].

use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Info,
    Success,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    /// Build a notification stamped with today's date (`YYYY-MM-DD`).
    pub fn new(title: impl Into<String>, variant: NotificationVariant) -> Self {
        Self {
            title: title.into(),
            description: Utc::now().format("%Y-%m-%d").to_string(),
            variant,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(title, NotificationVariant::Info)
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(title, NotificationVariant::Success)
    }

    pub fn destructive(title: impl Into<String>) -> Self {
        Self::new(title, NotificationVariant::Destructive)
    }
}

/// Sink for transient notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default notifier: writes notifications to the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            NotificationVariant::Destructive => {
                tracing::warn!(title = %notification.title, description = %notification.description, "notification")
            }
            _ => {
                tracing::info!(title = %notification.title, description = %notification.description, "notification")
            }
        }
    }
}

/// Keeps every notification in memory (headless hosts, tests).
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}
