//! Triage decision types and their consistency rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Assessed clinical risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Routine case.
    Low,
    /// Elevated but not immediately dangerous.
    Medium,
    /// Requires immediate attention.
    High,
}

impl RiskLevel {
    /// Returns the lowest queue priority compatible with this risk level.
    #[must_use]
    pub const fn minimum_priority(self) -> Priority {
        match self {
            Self::High => Priority::Priority,
            Self::Medium | Self::Low => Priority::Normal,
        }
    }

    /// Returns `true` when `priority` is an acceptable queue for this risk.
    #[must_use]
    pub fn permits(self, priority: Priority) -> bool {
        priority >= self.minimum_priority()
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::UnknownVariant {
                kind: "risk level",
                value: s.to_owned(),
            }),
        }
    }
}

/// Queue the patient is placed in. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Standard queue.
    Normal,
    /// Expedited queue.
    Priority,
    /// Seen immediately.
    Emergency,
}

impl Priority {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Priority => "Priority",
            Self::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "priority" => Ok(Self::Priority),
            "emergency" => Ok(Self::Emergency),
            _ => Err(Error::UnknownVariant {
                kind: "priority",
                value: s.to_owned(),
            }),
        }
    }
}

/// Unvalidated decision fields.
///
/// Used to assemble a [`Decision`] field by field; [`Decision::from_parts`]
/// enforces the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionParts {
    /// Assessed risk.
    pub risk_level: RiskLevel,
    /// Destination department label.
    pub department: String,
    /// Queue priority.
    pub priority: Priority,
    /// Human-readable wait estimate.
    #[serde(rename = "wait_time")]
    pub wait_estimate: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Evidence, most specific first.
    pub explanations: Vec<String>,
}

/// Final triage decision.
///
/// Serializes with the classifier wire names (`risk_level`, `wait_time`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DecisionParts")]
pub struct Decision {
    risk_level: RiskLevel,
    department: String,
    priority: Priority,
    #[serde(rename = "wait_time")]
    wait_estimate: String,
    confidence: f64,
    explanations: Vec<String>,
}

impl Decision {
    /// Validates the supplied parts and builds a decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDecision`] when the department or wait estimate
    /// is blank, the explanations are empty, the confidence lies outside
    /// `[0, 1]`, or the priority is too low for the risk level.
    pub fn from_parts(parts: DecisionParts) -> Result<Self> {
        if parts.department.trim().is_empty() {
            return Err(Error::invalid_decision("department cannot be empty"));
        }
        if parts.wait_estimate.trim().is_empty() {
            return Err(Error::invalid_decision("wait estimate cannot be empty"));
        }
        if parts.explanations.is_empty() {
            return Err(Error::invalid_decision(
                "decision requires at least one explanation",
            ));
        }
        if !(0.0..=1.0).contains(&parts.confidence) {
            return Err(Error::invalid_decision(format!(
                "confidence {} outside [0, 1]",
                parts.confidence
            )));
        }
        if !parts.risk_level.permits(parts.priority) {
            return Err(Error::invalid_decision(format!(
                "{} risk cannot be queued as {}",
                parts.risk_level, parts.priority
            )));
        }

        Ok(Self {
            risk_level: parts.risk_level,
            department: parts.department,
            priority: parts.priority,
            wait_estimate: parts.wait_estimate,
            confidence: parts.confidence,
            explanations: parts.explanations,
        })
    }

    /// Decomposes the decision for field-wise editing.
    #[must_use]
    pub fn into_parts(self) -> DecisionParts {
        DecisionParts {
            risk_level: self.risk_level,
            department: self.department,
            priority: self.priority,
            wait_estimate: self.wait_estimate,
            confidence: self.confidence,
            explanations: self.explanations,
        }
    }

    /// Returns the assessed risk.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns the destination department.
    #[must_use]
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Returns the queue priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the human-readable wait estimate.
    #[must_use]
    pub fn wait_estimate(&self) -> &str {
        &self.wait_estimate
    }

    /// Returns the confidence score.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the ordered explanations.
    #[must_use]
    pub fn explanations(&self) -> &[String] {
        &self.explanations
    }
}

impl TryFrom<DecisionParts> for Decision {
    type Error = Error;

    fn try_from(parts: DecisionParts) -> Result<Self> {
        Self::from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts() -> DecisionParts {
        DecisionParts {
            risk_level: RiskLevel::High,
            department: "Cardiology".into(),
            priority: Priority::Emergency,
            wait_estimate: "5 minutes".into(),
            confidence: 0.9,
            explanations: vec!["chest pain".into()],
        }
    }

    #[test]
    fn high_risk_requires_expedited_queue() {
        assert!(RiskLevel::High.permits(Priority::Emergency));
        assert!(RiskLevel::High.permits(Priority::Priority));
        assert!(!RiskLevel::High.permits(Priority::Normal));
        assert!(RiskLevel::Low.permits(Priority::Normal));

        let err = Decision::from_parts(DecisionParts {
            priority: Priority::Normal,
            ..parts()
        })
        .expect_err("inconsistent decision");
        assert!(matches!(err, Error::InvalidDecision { .. }));
    }

    #[test]
    fn rejects_empty_explanations_and_bad_confidence() {
        assert!(
            Decision::from_parts(DecisionParts {
                explanations: Vec::new(),
                ..parts()
            })
            .is_err()
        );
        assert!(
            Decision::from_parts(DecisionParts {
                confidence: 1.2,
                ..parts()
            })
            .is_err()
        );
        assert!(
            Decision::from_parts(DecisionParts {
                department: "  ".into(),
                ..parts()
            })
            .is_err()
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let decision = Decision::from_parts(parts()).unwrap();
        let value = serde_json::to_value(&decision).unwrap();

        assert_eq!(
            value,
            json!({
                "risk_level": "High",
                "department": "Cardiology",
                "priority": "Emergency",
                "wait_time": "5 minutes",
                "confidence": 0.9,
                "explanations": ["chest pain"],
            })
        );

        let parsed: Decision = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, decision);
    }

    #[test]
    fn deserialization_validates() {
        let err = serde_json::from_value::<Decision>(json!({
            "risk_level": "High",
            "department": "Cardiology",
            "priority": "Normal",
            "wait_time": "5 minutes",
            "confidence": 0.9,
            "explanations": ["x"],
        }));
        assert!(err.is_err());
    }

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!(" high ".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!("EMERGENCY".parse::<Priority>().unwrap(), Priority::Emergency);
        assert!("critical".parse::<RiskLevel>().is_err());
    }
}
