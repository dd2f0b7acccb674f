//! Observability utilities for the triage pipeline.
//!
//! Library crates only emit `tracing` events; binaries call [`init_tracing`]
//! once at startup to install a formatter.

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Output layout for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-field default layout.
    #[default]
    Full,
    /// Single-line abbreviated layout.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `triage_classifier=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Include the event target in each line.
    pub with_target: bool,
    /// Emit ANSI colour codes.
    pub ansi: bool,
    /// Line layout.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            with_target: false,
            ansi: true,
            format: LogFormat::Full,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// The offending directive.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Init {
        /// Underlying error message.
        reason: String,
    },
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Builds the event filter: `RUST_LOG` if set, otherwise `config.filter`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when `config.filter` is not a
/// valid directive and `RUST_LOG` is unset.
pub fn env_filter(config: &LoggingConfig) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        reason: err.to_string(),
    })
}

/// Installs a global `fmt` subscriber writing to standard error.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber has
/// already been installed.
pub fn init_tracing(config: &LoggingConfig) -> TelemetryResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|err| TelemetryError::Init {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_filters() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            filter: "triage=[".into(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            env_filter(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn second_install_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(matches!(
            init_tracing(&config),
            Err(TelemetryError::Init { .. })
        ));
    }
}
