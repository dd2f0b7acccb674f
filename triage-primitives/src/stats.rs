//! Dashboard aggregates computed over stored decisions.

use serde::{Deserialize, Serialize};

use crate::{Decision, Priority, RiskLevel};

/// Counts of decisions per risk level and per queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Number of decisions counted.
    pub total: usize,
    /// Decisions assessed as high risk.
    pub high_risk: usize,
    /// Decisions assessed as medium risk.
    pub medium_risk: usize,
    /// Decisions assessed as low risk.
    pub low_risk: usize,
    /// Decisions queued as emergency.
    pub emergency_queue: usize,
    /// Decisions queued as priority.
    pub priority_queue: usize,
    /// Decisions queued as normal.
    pub normal_queue: usize,
}

impl QueueStats {
    /// Adds one decision to the tallies.
    pub fn record(&mut self, decision: &Decision) {
        self.total += 1;
        match decision.risk_level() {
            RiskLevel::High => self.high_risk += 1,
            RiskLevel::Medium => self.medium_risk += 1,
            RiskLevel::Low => self.low_risk += 1,
        }
        match decision.priority() {
            Priority::Emergency => self.emergency_queue += 1,
            Priority::Priority => self.priority_queue += 1,
            Priority::Normal => self.normal_queue += 1,
        }
    }
}

impl<'a> FromIterator<&'a Decision> for QueueStats {
    fn from_iter<I: IntoIterator<Item = &'a Decision>>(iter: I) -> Self {
        let mut stats = Self::default();
        for decision in iter {
            stats.record(decision);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecisionParts;

    fn decision(risk_level: RiskLevel, priority: Priority) -> Decision {
        Decision::from_parts(DecisionParts {
            risk_level,
            department: "General Practice".into(),
            priority,
            wait_estimate: "30 minutes".into(),
            confidence: 0.8,
            explanations: vec!["x".into()],
        })
        .unwrap()
    }

    #[test]
    fn tallies_risk_and_queues() {
        let decisions = [
            decision(RiskLevel::High, Priority::Emergency),
            decision(RiskLevel::High, Priority::Priority),
            decision(RiskLevel::Medium, Priority::Priority),
            decision(RiskLevel::Low, Priority::Normal),
        ];

        let stats: QueueStats = decisions.iter().collect();

        assert_eq!(
            stats,
            QueueStats {
                total: 4,
                high_risk: 2,
                medium_risk: 1,
                low_risk: 1,
                emergency_queue: 1,
                priority_queue: 2,
                normal_queue: 1,
            }
        );
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let stats: QueueStats = std::iter::empty::<&Decision>().collect();
        assert_eq!(stats, QueueStats::default());
    }
}
