//! Patient triage decision SDK facade.
//!
//! Depend on this crate via `cargo add triage`. It bundles the workspace
//! crates behind feature flags so callers that only need, say, the rule
//! engine can leave the process machinery out.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared data types for convenience.
pub use triage_primitives as primitives;
pub use triage_primitives::{Decision, IntakeRecord, Priority, RiskLevel, TriageRecord};

/// Deterministic rule engine (enabled by `rules` feature).
#[cfg(feature = "rules")]
pub use triage_rules as rules;

/// External classifier invocation (enabled by `classifier` feature).
#[cfg(feature = "classifier")]
pub use triage_classifier as classifier;

/// Baseline, invocation, and reconciliation (enabled by `pipeline` feature).
#[cfg(feature = "pipeline")]
pub use triage_pipeline as pipeline;
#[cfg(feature = "pipeline")]
pub use triage_pipeline::{DecisionPipeline, DecisionSource, Evaluation};

/// Configuration loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use triage_config as config;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use triage_telemetry as telemetry;
