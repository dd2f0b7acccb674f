//! Strongly typed configuration schema.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use triage_rules::RuleEngineConfig;
use triage_telemetry::LoggingConfig;

use crate::{ConfigError, ConfigResult};

/// How to launch the external classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierSettings {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory for the child; inherits ours when unset.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the child.
    pub env: BTreeMap<String, String>,
    /// Invocation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of classifier processes alive at once.
    pub max_concurrent: usize,
    /// Cap on captured standard output.
    pub max_output_bytes: usize,
}

impl ClassifierSettings {
    /// Returns the timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_owned(),
            args: vec!["./model/predict.py".to_owned()],
            working_dir: None,
            env: BTreeMap::new(),
            timeout_ms: 10_000,
            max_concurrent: 4,
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriageConfig {
    /// External classifier settings.
    pub classifier: ClassifierSettings,
    /// Rule engine thresholds, defaults, and confidence range.
    pub rules: RuleEngineConfig,
    /// Logging setup.
    pub logging: LoggingConfig,
}

impl TriageConfig {
    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty program, a zero timeout,
    /// a zero concurrency or output cap, or invalid rule settings.
    pub fn validate(&self) -> ConfigResult<()> {
        let classifier = &self.classifier;
        if classifier.program.trim().is_empty() {
            return Err(ConfigError::invalid("classifier.program cannot be empty"));
        }
        if classifier.timeout_ms == 0 {
            return Err(ConfigError::invalid("classifier.timeout_ms must be positive"));
        }
        if classifier.max_concurrent == 0 {
            return Err(ConfigError::invalid(
                "classifier.max_concurrent must be positive",
            ));
        }
        if classifier.max_output_bytes == 0 {
            return Err(ConfigError::invalid(
                "classifier.max_output_bytes must be positive",
            ));
        }
        self.rules
            .validate()
            .map_err(|err| ConfigError::invalid(err.to_string()))
    }
}
