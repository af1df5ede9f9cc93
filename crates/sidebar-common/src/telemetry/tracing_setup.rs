//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level is used as the
//! global filter.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "debug", "trace")
    pub level: Level,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
    /// Annotate events with file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_line: true,
        }
    }
}

impl TracingConfig {
    /// Debug-level, human-readable output
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// Info-level JSON output for log aggregation
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json: true,
            file_line: false,
        }
    }

    /// Pick the output style matching a deployment environment.
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        if env.is_production() {
            Self::production()
        } else {
            Self::development()
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Panics
/// Panics if a subscriber is already set.
pub fn init_tracing(config: &TracingConfig) {
    try_init_tracing(config).expect("tracing subscriber already initialized");
}

/// Like [`init_tracing`] but returns an error when a subscriber is already
/// installed, which happens routinely across tests in one process.
pub fn try_init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    let events = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    let result = if config.json {
        registry.with(events.json()).try_init()
    } else {
        registry.with(events).try_init()
    };
    result.map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
