//! Shared error definitions for triage primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the triage workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or parsing triage primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided triage identifier could not be parsed.
    #[error("invalid triage id: {source}")]
    InvalidTriageId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Intake payload could not be interpreted as a record.
    #[error("invalid intake record: {reason}")]
    InvalidIntake {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Decision fields failed validation.
    #[error("invalid decision: {reason}")]
    InvalidDecision {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A textual enum value did not match any known variant.
    #[error("unknown {kind} `{value}`")]
    UnknownVariant {
        /// Name of the enum being parsed.
        kind: &'static str,
        /// The offending input.
        value: String,
    },
}

impl Error {
    /// Convenience constructor for decision validation failures.
    #[must_use]
    pub fn invalid_decision(reason: impl Into<String>) -> Self {
        Self::InvalidDecision {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for intake parsing failures.
    #[must_use]
    pub fn invalid_intake(reason: impl Into<String>) -> Self {
        Self::InvalidIntake {
            reason: reason.into(),
        }
    }
}
