//! Merges a classifier outcome into the rule-engine baseline.

use tracing::{debug, error, warn};
use triage_classifier::{ClassifierPayload, Outcome};
use triage_primitives::{Decision, DecisionParts, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Explanations {
    Replace,
    Append,
}

/// Produces the final decision from `baseline` and the invocation outcome.
///
/// - [`Outcome::Success`]: every usable payload field replaces the baseline
///   field; missing fields keep the baseline value individually.
/// - [`Outcome::ModelWarning`]: same overlay, except explanations are the
///   baseline's followed by the payload's, duplicates kept.
/// - [`Outcome::Failure`]: exactly `baseline`.
///
/// When the overlay pairs a high risk with a normal priority, the priority is
/// lifted to [`Priority::Emergency`]. The result is always a valid
/// [`Decision`].
#[must_use]
pub fn reconcile(baseline: Decision, outcome: &Outcome) -> Decision {
    match outcome {
        Outcome::Success(payload) => overlay(baseline, payload, Explanations::Replace),
        Outcome::ModelWarning(payload) => {
            warn!(
                error = payload.error().unwrap_or_default(),
                "classifier flagged its result; merging with rule baseline"
            );
            overlay(baseline, payload, Explanations::Append)
        }
        Outcome::Failure(failure) => {
            debug!(kind = %failure.kind(), "classifier failed; using rule baseline");
            baseline
        }
    }
}

fn overlay(baseline: Decision, payload: &ClassifierPayload, mode: Explanations) -> Decision {
    let mut parts = baseline.clone().into_parts();

    if let Some(risk_level) = payload.risk_level() {
        parts.risk_level = risk_level;
    }
    if let Some(department) = payload.department() {
        parts.department = department.to_owned();
    }
    if let Some(priority) = payload.priority() {
        parts.priority = priority;
    }
    if let Some(wait_estimate) = payload.wait_estimate() {
        parts.wait_estimate = wait_estimate.to_owned();
    }
    if let Some(confidence) = payload.confidence() {
        parts.confidence = confidence;
    }
    if let Some(explanations) = payload.explanations() {
        match mode {
            Explanations::Replace => parts.explanations = explanations.to_vec(),
            Explanations::Append => parts.explanations.extend_from_slice(explanations),
        }
    }

    lift_priority(&mut parts);

    match Decision::from_parts(parts) {
        Ok(decision) => decision,
        Err(err) => {
            error!(error = %err, "reconciled decision rejected; using rule baseline");
            baseline
        }
    }
}

fn lift_priority(parts: &mut DecisionParts) {
    if parts.risk_level.permits(parts.priority) {
        return;
    }
    warn!(
        risk = %parts.risk_level,
        priority = %parts.priority,
        "classifier risk and priority disagree; lifting priority"
    );
    parts.priority = Priority::Emergency;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use triage_classifier::{FailureKind, InvocationFailure};
    use triage_primitives::RiskLevel;

    fn baseline() -> Decision {
        Decision::from_parts(DecisionParts {
            risk_level: RiskLevel::Low,
            department: "General Practice".into(),
            priority: Priority::Normal,
            wait_estimate: "30 minutes".into(),
            confidence: 0.8,
            explanations: vec!["a".into()],
        })
        .unwrap()
    }

    fn payload(value: &Value) -> ClassifierPayload {
        ClassifierPayload::from_object(value.as_object().unwrap())
    }

    #[test]
    fn failure_returns_baseline_exactly() {
        for kind in [
            FailureKind::SpawnError,
            FailureKind::Timeout,
            FailureKind::NonZeroExit,
            FailureKind::MalformedOutput,
        ] {
            let outcome = Outcome::Failure(InvocationFailure::new(kind, "boom"));
            assert_eq!(reconcile(baseline(), &outcome), baseline());
        }
    }

    #[test]
    fn success_overrides_present_fields_only() {
        let outcome = Outcome::Success(payload(&json!({
            "risk_level": "Medium",
            "department": "Neurology",
            "priority": "Priority",
            "wait_time": "20 minutes",
            "explanations": ["model says so"],
        })));

        let decision = reconcile(baseline(), &outcome);

        assert_eq!(decision.risk_level(), RiskLevel::Medium);
        assert_eq!(decision.department(), "Neurology");
        assert_eq!(decision.priority(), Priority::Priority);
        assert_eq!(decision.wait_estimate(), "20 minutes");
        assert!((decision.confidence() - 0.8).abs() < f64::EPSILON);
        assert_eq!(decision.explanations(), ["model says so"]);
    }

    #[test]
    fn empty_success_payload_keeps_baseline() {
        let outcome = Outcome::Success(payload(&json!({})));
        assert_eq!(reconcile(baseline(), &outcome), baseline());
    }

    #[test]
    fn warning_appends_explanations_in_order() {
        let outcome = Outcome::ModelWarning(payload(&json!({
            "error": "low confidence",
            "explanations": ["x", "y"],
        })));

        let decision = reconcile(baseline(), &outcome);

        assert_eq!(decision.explanations(), ["a", "x", "y"]);
        assert_eq!(decision.department(), "General Practice");
    }

    #[test]
    fn warning_keeps_duplicate_explanations() {
        let outcome = Outcome::ModelWarning(payload(&json!({
            "error": true,
            "explanations": ["a"],
            "confidence": 0.4,
        })));

        let decision = reconcile(baseline(), &outcome);

        assert_eq!(decision.explanations(), ["a", "a"]);
        assert!((decision.confidence() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn warning_overlay_is_field_wise() {
        let outcome = Outcome::ModelWarning(payload(&json!({
            "error": "partial",
            "risk_level": "Medium",
        })));

        let decision = reconcile(baseline(), &outcome);

        assert_eq!(decision.risk_level(), RiskLevel::Medium);
        assert_eq!(decision.department(), "General Practice");
        assert_eq!(decision.priority(), Priority::Normal);
        assert_eq!(decision.explanations(), ["a"]);
    }

    #[test]
    fn high_risk_with_normal_priority_is_lifted() {
        let outcome = Outcome::Success(payload(&json!({ "risk_level": "High" })));
        let decision = reconcile(baseline(), &outcome);
        assert_eq!(decision.risk_level(), RiskLevel::High);
        assert_eq!(decision.priority(), Priority::Emergency);

        let outcome = Outcome::Success(payload(&json!({
            "risk_level": "High",
            "priority": "Normal",
        })));
        let decision = reconcile(baseline(), &outcome);
        assert_eq!(decision.priority(), Priority::Emergency);
    }

    #[test]
    fn high_risk_with_priority_queue_is_kept() {
        let outcome = Outcome::Success(payload(&json!({
            "risk_level": "High",
            "priority": "Priority",
        })));
        let decision = reconcile(baseline(), &outcome);
        assert_eq!(decision.priority(), Priority::Priority);
    }

    #[test]
    fn unusable_fields_fall_back_individually() {
        let outcome = Outcome::Success(payload(&json!({
            "risk_level": "Severe",
            "department": "   ",
            "confidence": 1.7,
            "explanations": [],
            "priority": "Emergency",
        })));

        let decision = reconcile(baseline(), &outcome);

        assert_eq!(decision.risk_level(), RiskLevel::Low);
        assert_eq!(decision.department(), "General Practice");
        assert!((decision.confidence() - 0.8).abs() < f64::EPSILON);
        assert_eq!(decision.explanations(), ["a"]);
        assert_eq!(decision.priority(), Priority::Emergency);
    }
}
