//! Configuration management for the triage pipeline.
//!
//! A [`TriageConfig`] is read from TOML and then overlaid with `TRIAGE_*`
//! environment variables. Every section has defaults, so an empty file (or
//! no file at all) yields a working configuration.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_ARGS, ENV_LOG, ENV_MAX_CONCURRENT, ENV_PROGRAM, ENV_TIMEOUT_MS};
pub use schema::{ClassifierSettings, TriageConfig};
