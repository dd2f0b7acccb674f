//! Configuration loaders.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, then
//! `TRIAGE_*` environment variables.

use std::path::Path;

use tracing::debug;

use crate::{ConfigError, ConfigResult, TriageConfig};

/// Overrides `classifier.program`.
pub const ENV_PROGRAM: &str = "TRIAGE_CLASSIFIER_PROGRAM";
/// Overrides `classifier.args`; whitespace separated.
pub const ENV_ARGS: &str = "TRIAGE_CLASSIFIER_ARGS";
/// Overrides `classifier.timeout_ms`.
pub const ENV_TIMEOUT_MS: &str = "TRIAGE_TIMEOUT_MS";
/// Overrides `classifier.max_concurrent`.
pub const ENV_MAX_CONCURRENT: &str = "TRIAGE_MAX_CONCURRENT";
/// Overrides `logging.filter`.
pub const ENV_LOG: &str = "TRIAGE_LOG";

impl TriageConfig {
    /// Parses a TOML document. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&source)
    }

    /// Full load: optional file, process environment, then validation.
    ///
    /// # Errors
    ///
    /// Propagates file, parse, environment, and validation errors.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `TRIAGE_*` overrides using `lookup` to read variables.
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a numeric override does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(program) = get(ENV_PROGRAM) {
            self.classifier.program = program.trim().to_owned();
        }
        if let Some(args) = get(ENV_ARGS) {
            self.classifier.args = args.split_whitespace().map(str::to_owned).collect();
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            self.classifier.timeout_ms = parse_number(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_MAX_CONCURRENT) {
            self.classifier.max_concurrent = parse_number(ENV_MAX_CONCURRENT, &raw)?;
        }
        if let Some(filter) = get(ENV_LOG) {
            self.logging.filter = filter;
        }
        Ok(())
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Env {
        var,
        reason: format!("`{raw}`: {err}"),
    })
}
