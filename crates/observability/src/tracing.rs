//! Tracing subscriber initialization.
//!
//! JSON lines by default, human-readable output on request. The filter comes
//! from `RUST_LOG` and falls back to `info`; the format from `DASHKIT_LOG_FORMAT`.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log format {0:?} (expected \"json\" or \"pretty\")")]
pub struct LogFormatError(pub String);

impl FromStr for LogFormat {
    type Err = LogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(LogFormatError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,dashkit_forms=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    /// Unknown formats fall back to JSON.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.trim().is_empty() {
                config.filter = filter;
            }
        }
        if let Ok(raw) = std::env::var("DASHKIT_LOG_FORMAT") {
            config.format = raw.parse().unwrap_or_default();
        }
        config
    }
}

/// Initialize tracing/logging for the process from the environment.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(ObservabilityConfig::from_env());
}

/// Install a global subscriber. Returns `false` when one was already set.
pub fn init_with(config: ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init()
            .is_ok(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .is_ok(),
    };

    if installed {
        ::tracing::debug!(filter = %config.filter, format = ?config.format, "logging initialized");
    }
    installed
}
