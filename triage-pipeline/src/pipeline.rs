//! The `evaluate` entry point.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, info, info_span};
use triage_classifier::{
    Classifier, FailureKind, InvokerConfig, Outcome, ProcessClassifier, ProcessClassifierConfig,
    ProcessInvoker, ProcessLimiter,
};
use triage_config::{ConfigError, TriageConfig};
use triage_primitives::{Decision, IntakeRecord, TriageId, TriageRecord};
use triage_rules::{RuleEngine, RulesError};

use crate::reconcile::reconcile;

/// Errors raised while assembling a pipeline.
///
/// Evaluation itself never fails.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The rule engine rejected its configuration.
    #[error(transparent)]
    Rules(#[from] RulesError),
    /// The configuration document is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for pipeline construction.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Which path produced the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "failure")]
pub enum DecisionSource {
    /// The classifier succeeded; its fields override the baseline.
    Classifier,
    /// The classifier flagged a warning; its output was layered on the
    /// baseline.
    Merged,
    /// The classifier failed; the rule baseline stands.
    Fallback(FailureKind),
}

impl DecisionSource {
    fn of(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success(_) => Self::Classifier,
            Outcome::ModelWarning(_) => Self::Merged,
            Outcome::Failure(failure) => Self::Fallback(failure.kind()),
        }
    }

    /// Returns the failure category when the baseline was used.
    #[must_use]
    pub const fn failure_kind(self) -> Option<FailureKind> {
        match self {
            Self::Fallback(kind) => Some(kind),
            Self::Classifier | Self::Merged => None,
        }
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classifier => f.write_str("classifier"),
            Self::Merged => f.write_str("merged"),
            Self::Fallback(kind) => write!(f, "fallback({kind})"),
        }
    }
}

/// A decision together with how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    id: TriageId,
    decision: Decision,
    source: DecisionSource,
}

impl Evaluation {
    /// Returns the evaluation identifier.
    #[must_use]
    pub const fn id(&self) -> TriageId {
        self.id
    }

    /// Returns the final decision.
    #[must_use]
    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    /// Returns the path that produced the decision.
    #[must_use]
    pub const fn source(&self) -> DecisionSource {
        self.source
    }

    /// Discards the metadata and returns the decision.
    #[must_use]
    pub fn into_decision(self) -> Decision {
        self.decision
    }

    /// Pairs the decision with its intake for persistence.
    #[must_use]
    pub fn into_record(self, intake: IntakeRecord) -> TriageRecord {
        TriageRecord::new(self.id, intake, self.decision)
    }
}

/// Rule baseline, one classifier call, reconciliation.
///
/// Holds no per-request state; share it behind an [`Arc`] and call
/// [`evaluate`](Self::evaluate) from as many tasks as needed.
#[derive(Debug, Clone)]
pub struct DecisionPipeline {
    rules: RuleEngine,
    invoker: ProcessInvoker,
}

impl DecisionPipeline {
    /// Creates a pipeline from its two stages.
    #[must_use]
    pub fn new(rules: RuleEngine, invoker: ProcessInvoker) -> Self {
        Self { rules, invoker }
    }

    /// Builds the production pipeline: a process classifier bounded by a
    /// shared limiter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the configuration fails
    /// validation and [`PipelineError::Rules`] when the rule table cannot be
    /// built.
    pub fn from_config(config: &TriageConfig) -> PipelineResult<Self> {
        config.validate()?;
        let settings = &config.classifier;

        let mut process = ProcessClassifierConfig::new(&settings.program)
            .with_args(&settings.args)
            .with_max_output_bytes(settings.max_output_bytes);
        if let Some(dir) = &settings.working_dir {
            process = process.with_working_dir(dir);
        }
        for (key, value) in &settings.env {
            process = process.with_env(key, value);
        }

        let max_concurrent = NonZeroUsize::new(settings.max_concurrent)
            .ok_or_else(|| ConfigError::invalid("classifier.max_concurrent must be positive"))?;
        let limiter = ProcessLimiter::new(max_concurrent);
        let invoker = ProcessInvoker::new(
            Arc::new(ProcessClassifier::new(process)) as Arc<dyn Classifier>,
            InvokerConfig::new(settings.timeout()).with_limiter(limiter),
        );

        Ok(Self::new(RuleEngine::new(config.rules)?, invoker))
    }

    /// Returns the rule engine.
    #[must_use]
    pub const fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Returns the classifier invoker.
    #[must_use]
    pub const fn invoker(&self) -> &ProcessInvoker {
        &self.invoker
    }

    /// Produces a decision for `intake`. Never fails: classifier problems
    /// degrade to the rule baseline.
    pub async fn evaluate(&self, intake: &IntakeRecord) -> Decision {
        self.evaluate_detailed(intake).await.into_decision()
    }

    /// Like [`evaluate`](Self::evaluate), also reporting the evaluation id and
    /// which path produced the decision.
    pub async fn evaluate_detailed(&self, intake: &IntakeRecord) -> Evaluation {
        let id = TriageId::random();
        let span = info_span!("triage", id = %id);
        async {
            let baseline = self.rules.classify(intake);
            let outcome = self.invoker.invoke(intake).await;
            let source = DecisionSource::of(&outcome);
            let decision = reconcile(baseline, &outcome);
            info!(
                %source,
                risk = %decision.risk_level(),
                priority = %decision.priority(),
                "triage decision reached"
            );
            Evaluation {
                id,
                decision,
                source,
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use triage_classifier::{RawOutput, StaticClassifier};
    use triage_primitives::{Priority, RiskLevel};
    use triage_rules::{FixedConfidence, ROUTINE_EXPLANATION, RuleEngineConfig};

    fn pipeline(classifier: StaticClassifier) -> DecisionPipeline {
        let rules = RuleEngine::new(RuleEngineConfig::default())
            .unwrap()
            .with_confidence_source(Arc::new(FixedConfidence(0.8)));
        let invoker = ProcessInvoker::new(
            Arc::new(classifier),
            InvokerConfig::new(Duration::from_secs(2)),
        );
        DecisionPipeline::new(rules, invoker)
    }

    fn headache() -> IntakeRecord {
        IntakeRecord::new()
            .with_symptoms("mild headache")
            .with_blood_pressure("118/76")
            .with_heart_rate(72.0)
            .with_temperature(98.4)
    }

    #[tokio::test]
    async fn failure_yields_the_baseline() {
        let pipeline = pipeline(StaticClassifier::unreachable("no interpreter"));
        let intake = headache();

        let evaluation = pipeline.evaluate_detailed(&intake).await;

        assert_eq!(evaluation.decision(), &pipeline.rules().classify(&intake));
        assert_eq!(
            evaluation.source(),
            DecisionSource::Fallback(FailureKind::SpawnError)
        );
    }

    #[tokio::test]
    async fn partial_success_fills_from_baseline() {
        let pipeline = pipeline(StaticClassifier::json(
            &json!({ "risk_level": "Low", "confidence": 0.99 }),
        ));

        let evaluation = pipeline.evaluate_detailed(&headache()).await;
        let decision = evaluation.decision();

        assert_eq!(evaluation.source(), DecisionSource::Classifier);
        assert_eq!(decision.risk_level(), RiskLevel::Low);
        assert!((decision.confidence() - 0.99).abs() < f64::EPSILON);
        assert_eq!(decision.department(), "General Practice");
        assert_eq!(decision.priority(), Priority::Normal);
        assert_eq!(decision.wait_estimate(), "30 minutes");
        assert_eq!(decision.explanations(), [ROUTINE_EXPLANATION]);
    }

    #[tokio::test]
    async fn warning_is_reported_as_merged() {
        let pipeline = pipeline(StaticClassifier::json(&json!({
            "error": "model degraded",
            "explanations": ["Feature drift detected."],
        })));

        let evaluation = pipeline.evaluate_detailed(&headache()).await;

        assert_eq!(evaluation.source(), DecisionSource::Merged);
        assert_eq!(
            evaluation.decision().explanations(),
            [ROUTINE_EXPLANATION, "Feature drift detected."]
        );
    }

    #[tokio::test]
    async fn non_zero_exit_falls_back() {
        let pipeline = pipeline(StaticClassifier::replying(RawOutput::new(
            Some(2),
            r#"{"risk_level":"High"}"#,
            "ImportError: joblib",
        )));

        let decision = pipeline.evaluate(&headache()).await;

        assert_eq!(decision.risk_level(), RiskLevel::Low);
    }

    #[tokio::test]
    async fn each_evaluation_has_its_own_id() {
        let pipeline = pipeline(StaticClassifier::json(&json!({})));
        let first = pipeline.evaluate_detailed(&headache()).await;
        let second = pipeline.evaluate_detailed(&headache()).await;
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn record_carries_intake_and_decision() {
        let pipeline = pipeline(StaticClassifier::json(&json!({})));
        let intake = headache().with_name("Ada");

        let evaluation = pipeline.evaluate_detailed(&intake).await;
        let id = evaluation.id();
        let record = evaluation.into_record(intake.clone());

        assert_eq!(record.id(), id);
        assert_eq!(record.intake(), &intake);
        assert_eq!(record.decision().department(), "General Practice");
    }

    #[test]
    fn source_display_and_failure_kind() {
        let source = DecisionSource::Fallback(FailureKind::Timeout);
        assert_eq!(source.to_string(), "fallback(timeout)");
        assert_eq!(source.failure_kind(), Some(FailureKind::Timeout));
        assert_eq!(DecisionSource::Merged.failure_kind(), None);
        assert_eq!(
            serde_json::to_value(source).unwrap(),
            json!({ "source": "fallback", "failure": "timeout" })
        );
    }

    #[test]
    fn from_config_rejects_invalid_settings() {
        let mut config = TriageConfig::default();
        config.classifier.max_concurrent = 0;
        assert!(matches!(
            DecisionPipeline::from_config(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn from_config_applies_timeout_and_limit() {
        let mut config = TriageConfig::default();
        config.classifier.timeout_ms = 1500;
        config.classifier.max_concurrent = 2;

        let pipeline = DecisionPipeline::from_config(&config).unwrap();
        let invoker = pipeline.invoker().config();

        assert_eq!(invoker.timeout(), Duration::from_millis(1500));
        assert_eq!(invoker.limiter().map(ProcessLimiter::available), Some(2));
    }
}
