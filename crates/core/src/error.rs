//! Configuration error model.

use thiserror::Error;

/// Result type used by constructors and loaders.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Caller configuration error.
///
/// These are programmer errors (missing rule table, a form with neither a schema
/// nor an item to infer one from). Runtime failures such as transport errors or
/// validation failures are modelled elsewhere and never use this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No rule table was supplied at all.
    #[error("no RBAC rule table configured")]
    MissingRules,

    /// A form has no schema and no item whose shape could be used instead.
    #[error("form has neither a validation schema nor an item to derive one from")]
    MissingSchema,

    /// Configuration was present but malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}
