//! Persistable triage records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Decision, IntakeRecord, TriageId};

/// An intake paired with the decision produced for it.
///
/// Serializes as one flat JSON object: the intake fields (including any
/// pass-through keys), the decision fields, an `id` and a `date`. This is the
/// shape storage layers persist; the pipeline itself never writes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageRecord {
    id: TriageId,
    #[serde(rename = "date")]
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    intake: IntakeRecord,
    #[serde(flatten)]
    decision: Decision,
}

impl TriageRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(id: TriageId, intake: IntakeRecord, decision: Decision) -> Self {
        Self::at(id, intake, decision, Utc::now())
    }

    /// Creates a record with an explicit timestamp.
    #[must_use]
    pub fn at(
        id: TriageId,
        intake: IntakeRecord,
        decision: Decision,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            recorded_at,
            intake,
            decision,
        }
    }

    /// Returns the evaluation identifier.
    #[must_use]
    pub const fn id(&self) -> TriageId {
        self.id
    }

    /// Returns when the record was created.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Returns the original intake.
    #[must_use]
    pub fn intake(&self) -> &IntakeRecord {
        &self.intake
    }

    /// Returns the decision.
    #[must_use]
    pub fn decision(&self) -> &Decision {
        &self.decision
    }
}
