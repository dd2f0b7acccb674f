//! Rule-based triage classification.
//!
//! The [`RuleEngine`] maps an intake record to a decision using a fixed,
//! ordered decision table. It never fails and never blocks, which makes it the
//! baseline every pipeline evaluation starts from.

#![warn(missing_docs, clippy::pedantic)]

pub mod config;
pub mod confidence;
pub mod engine;

pub use confidence::{ConfidenceSource, FixedConfidence, SeededConfidence, ThreadRngConfidence};
pub use config::{
    ConfidenceRange, DEFAULT_DIASTOLIC, DEFAULT_HEART_RATE, DEFAULT_SYSTOLIC,
    DEFAULT_TEMPERATURE_F, RuleEngineConfig, Thresholds, VitalDefaults, Vitals,
};
pub use engine::{
    ROUTINE_EXPLANATION, RuleEngine, RuleMatcher, RuleVerdict, RulesError, RulesResult,
    TriageRule,
};
