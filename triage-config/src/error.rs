//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Source [`std::io::Error`].
        source: std::io::Error,
    },
    /// The file is not valid TOML for the schema.
    #[error("malformed config: {source}")]
    Parse {
        /// Source TOML error.
        #[from]
        source: toml::de::Error,
    },
    /// An environment override could not be interpreted.
    #[error("invalid value for {var}: {reason}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// Values parsed but are unusable.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Human-readable reason.
        reason: String,
    },
}

impl ConfigError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
