//! Core shared types for the triage decision pipeline.

#![warn(missing_docs, clippy::pedantic)]

mod decision;
mod error;
mod ids;
mod intake;
mod lenient;
mod record;
mod stats;

/// Triage outcome types and their consistency rules.
pub use decision::{Decision, DecisionParts, Priority, RiskLevel};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier attached to each triage evaluation.
pub use ids::TriageId;
/// Caller-supplied patient data.
pub use intake::{BloodPressure, IntakeRecord};
/// Persistable pairing of an intake and its decision.
pub use record::TriageRecord;
/// Dashboard aggregates over stored decisions.
pub use stats::QueueStats;
