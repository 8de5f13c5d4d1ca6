//! `dashkit-core`: shared building blocks for the dashboard toolkit.
//!
//! This crate has no knowledge of HTTP, authorization rules or forms.

pub mod entity;
pub mod error;
pub mod id;
pub mod notify;

pub use entity::{Entity, entity_id, has_id};
pub use error::{ConfigError, ConfigResult};
pub use id::EntityId;
pub use notify::{Notification, NotificationVariant, Notifier, RecordingNotifier, TracingNotifier};
