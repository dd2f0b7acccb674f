//! Ordered decision table and the rule engine that evaluates it.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use triage_primitives::{Decision, DecisionParts, IntakeRecord, Priority, RiskLevel};

use crate::confidence::{ConfidenceSource, ThreadRngConfidence};
use crate::config::{RuleEngineConfig, Thresholds, Vitals};

/// Explanation attached when no rule contributed evidence.
pub const ROUTINE_EXPLANATION: &str = "Routine checkup based on reported symptoms.";

/// Errors surfaced while configuring the rule engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    /// Configuration values are out of bounds or inconsistent.
    #[error("invalid rule engine configuration: {0}")]
    InvalidConfig(&'static str),
    /// A rule's verdict violates decision invariants.
    #[error("invalid triage rule `{name}`: {reason}")]
    InvalidRule {
        /// Name of the offending rule.
        name: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },
}

/// Result alias for rule engine operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Decides whether a rule applies to an intake.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMatcher {
    /// Symptom text contains any of the lowercase phrases.
    SymptomsMention(Vec<String>),
    /// Any of the supplied vital-sign bounds is exceeded.
    VitalsAbove {
        /// Systolic pressure bound.
        systolic: Option<i64>,
        /// Heart rate bound.
        heart_rate: Option<f64>,
        /// Temperature bound.
        temperature: Option<f64>,
    },
}

impl RuleMatcher {
    fn matches(&self, symptoms: &str, vitals: &Vitals) -> bool {
        match self {
            Self::SymptomsMention(phrases) => {
                phrases.iter().any(|phrase| symptoms.contains(phrase.as_str()))
            }
            Self::VitalsAbove {
                systolic,
                heart_rate,
                temperature,
            } => {
                systolic.is_some_and(|bound| vitals.systolic > bound)
                    || heart_rate.is_some_and(|bound| vitals.heart_rate > bound)
                    || temperature.is_some_and(|bound| vitals.temperature > bound)
            }
        }
    }
}

/// Fields a matching rule assigns to the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    risk_level: RiskLevel,
    department: String,
    priority: Priority,
    wait_estimate: String,
    explanation: Option<String>,
}

impl RuleVerdict {
    /// Creates a verdict.
    #[must_use]
    pub fn new(
        risk_level: RiskLevel,
        department: impl Into<String>,
        priority: Priority,
        wait_estimate: impl Into<String>,
    ) -> Self {
        Self {
            risk_level,
            department: department.into(),
            priority,
            wait_estimate: wait_estimate.into(),
            explanation: None,
        }
    }

    /// Attaches the evidence sentence recorded when the rule fires.
    #[must_use]
    pub fn explained_by(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Returns the assigned risk level.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns the assigned department.
    #[must_use]
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Returns the assigned priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the assigned wait estimate.
    #[must_use]
    pub fn wait_estimate(&self) -> &str {
        &self.wait_estimate
    }

    /// Returns the explanation, if any.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    fn check(&self, name: &str) -> RulesResult<()> {
        let invalid = |reason| RulesError::InvalidRule {
            name: name.to_owned(),
            reason,
        };
        if !self.risk_level.permits(self.priority) {
            return Err(invalid("priority too low for risk level"));
        }
        if self.department.trim().is_empty() {
            return Err(invalid("department cannot be empty"));
        }
        if self.wait_estimate.trim().is_empty() {
            return Err(invalid("wait estimate cannot be empty"));
        }
        if self
            .explanation
            .as_deref()
            .is_some_and(|text| text.trim().is_empty())
        {
            return Err(invalid("explanation cannot be blank"));
        }
        Ok(())
    }
}

/// Named rule consisting of a matcher and the verdict it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageRule {
    name: String,
    matcher: RuleMatcher,
    verdict: RuleVerdict,
}

impl TriageRule {
    /// Creates a rule, validating the verdict's consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidRule`] when the name is empty or the
    /// verdict would produce an inconsistent decision.
    pub fn new(
        name: impl Into<String>,
        matcher: RuleMatcher,
        verdict: RuleVerdict,
    ) -> RulesResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RulesError::InvalidRule {
                name,
                reason: "rule name cannot be empty",
            });
        }
        verdict.check(&name)?;
        Ok(Self {
            name,
            matcher,
            verdict,
        })
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the matcher.
    #[must_use]
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// Returns the verdict.
    #[must_use]
    pub fn verdict(&self) -> &RuleVerdict {
        &self.verdict
    }
}

fn standard_rules(thresholds: &Thresholds) -> RulesResult<(Vec<TriageRule>, RuleVerdict)> {
    let rules = vec![
        TriageRule::new(
            "cardiac-symptoms",
            RuleMatcher::SymptomsMention(vec![
                "chest pain".to_owned(),
                "shortness of breath".to_owned(),
            ]),
            RuleVerdict::new(RiskLevel::High, "Cardiology", Priority::Emergency, "5 minutes")
                .explained_by("High-risk symptoms detected (chest pain/breathlessness)."),
        )?,
        TriageRule::new(
            "critical-vitals",
            RuleMatcher::VitalsAbove {
                systolic: Some(thresholds.critical_systolic),
                heart_rate: Some(thresholds.critical_heart_rate),
                temperature: Some(thresholds.critical_temperature),
            },
            RuleVerdict::new(RiskLevel::High, "Emergency", Priority::Emergency, "10 minutes")
                .explained_by("Vital signs indicate immediate attention needed."),
        )?,
        TriageRule::new(
            "elevated-vitals",
            RuleMatcher::VitalsAbove {
                systolic: Some(thresholds.elevated_systolic),
                heart_rate: None,
                temperature: Some(thresholds.elevated_temperature),
            },
            RuleVerdict::new(
                RiskLevel::Medium,
                "Internal Medicine",
                Priority::Priority,
                "45 minutes",
            )
            .explained_by("Elevated vitals detected."),
        )?,
    ];

    let routine = RuleVerdict::new(
        RiskLevel::Low,
        "General Practice",
        Priority::Normal,
        "30 minutes",
    );

    Ok((rules, routine))
}

/// Deterministic, first-match-wins triage classifier.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: RuleEngineConfig,
    rules: Vec<TriageRule>,
    routine: RuleVerdict,
    confidence: Arc<dyn ConfidenceSource>,
}

impl RuleEngine {
    /// Builds the standard decision table from `config`, drawing confidence
    /// from the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidConfig`] when the configuration fails
    /// validation.
    pub fn new(config: RuleEngineConfig) -> RulesResult<Self> {
        config.validate()?;
        let (rules, routine) = standard_rules(&config.thresholds)?;
        Ok(Self {
            config,
            rules,
            routine,
            confidence: Arc::new(ThreadRngConfidence),
        })
    }

    /// Replaces the confidence source.
    #[must_use]
    pub fn with_confidence_source(mut self, source: Arc<dyn ConfidenceSource>) -> Self {
        self.confidence = source;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TriageRule] {
        &self.rules
    }

    /// Classifies an intake record.
    ///
    /// The first matching rule decides; when none matches the routine verdict
    /// applies. The explanation list is never empty.
    ///
    /// # Panics
    ///
    /// Panics only if the decision table itself is defective, which
    /// construction-time validation rules out.
    #[must_use]
    pub fn classify(&self, intake: &IntakeRecord) -> Decision {
        let vitals = Vitals::resolve(intake, &self.config.defaults);
        let symptoms = intake.symptoms().unwrap_or_default().to_lowercase();

        let verdict = match self
            .rules
            .iter()
            .find(|rule| rule.matcher.matches(&symptoms, &vitals))
        {
            Some(rule) => {
                debug!(rule = rule.name(), risk = %rule.verdict.risk_level, "triage rule matched");
                &rule.verdict
            }
            None => {
                debug!("no triage rule matched; routine verdict applies");
                &self.routine
            }
        };

        let mut explanations: Vec<String> = verdict.explanation.iter().cloned().collect();
        if explanations.is_empty() {
            explanations.push(ROUTINE_EXPLANATION.to_owned());
        }

        Decision::from_parts(DecisionParts {
            risk_level: verdict.risk_level,
            department: verdict.department.clone(),
            priority: verdict.priority,
            wait_estimate: verdict.wait_estimate.clone(),
            confidence: self.draw_confidence(),
            explanations,
        })
        .expect("rule verdicts are validated at construction")
    }

    fn draw_confidence(&self) -> f64 {
        let range = self.config.confidence;
        let mut raw = self.confidence.sample(range);
        if !raw.is_finite() {
            warn!(raw, "confidence source returned a non-finite value");
            raw = range.low;
        }
        range.clamp((raw * 100.0).round() / 100.0)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleEngineConfig::default()).expect("default rule configuration is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::FixedConfidence;
    use crate::config::ConfidenceRange;

    fn engine() -> RuleEngine {
        RuleEngine::default().with_confidence_source(Arc::new(FixedConfidence(0.8)))
    }

    #[test]
    fn cardiac_symptoms_win_over_vitals() {
        let intake = IntakeRecord::new()
            .with_symptoms("Severe CHEST PAIN since morning")
            .with_blood_pressure("170/100")
            .with_heart_rate(120.0);

        let decision = engine().classify(&intake);

        assert_eq!(decision.risk_level(), RiskLevel::High);
        assert_eq!(decision.department(), "Cardiology");
        assert_eq!(decision.priority(), Priority::Emergency);
        assert_eq!(decision.wait_estimate(), "5 minutes");
        assert_eq!(
            decision.explanations(),
            ["High-risk symptoms detected (chest pain/breathlessness)."]
        );
    }

    #[test]
    fn breathlessness_counts_as_cardiac() {
        let intake = IntakeRecord::new().with_symptoms("shortness of breath on stairs");
        assert_eq!(engine().classify(&intake).department(), "Cardiology");
    }

    #[test]
    fn critical_vitals_route_to_emergency() {
        for intake in [
            IntakeRecord::new().with_blood_pressure("161/90"),
            IntakeRecord::new().with_heart_rate(111.0),
            IntakeRecord::new().with_temperature(103.5),
        ] {
            let decision = engine().classify(&intake);
            assert_eq!(decision.risk_level(), RiskLevel::High);
            assert_eq!(decision.department(), "Emergency");
            assert_eq!(decision.priority(), Priority::Emergency);
            assert_eq!(decision.wait_estimate(), "10 minutes");
            assert_eq!(
                decision.explanations(),
                ["Vital signs indicate immediate attention needed."]
            );
        }
    }

    #[test]
    fn elevated_vitals_route_to_internal_medicine() {
        for intake in [
            IntakeRecord::new().with_blood_pressure("150/90"),
            IntakeRecord::new().with_temperature(101.5),
        ] {
            let decision = engine().classify(&intake);
            assert_eq!(decision.risk_level(), RiskLevel::Medium);
            assert_eq!(decision.department(), "Internal Medicine");
            assert_eq!(decision.priority(), Priority::Priority);
            assert_eq!(decision.wait_estimate(), "45 minutes");
            assert_eq!(decision.explanations(), ["Elevated vitals detected."]);
        }
    }

    #[test]
    fn bounds_are_strict() {
        let intake = IntakeRecord::new()
            .with_blood_pressure("140/90")
            .with_heart_rate(110.0)
            .with_temperature(101.0);

        assert_eq!(engine().classify(&intake).risk_level(), RiskLevel::Low);
    }

    #[test]
    fn empty_intake_is_routine() {
        let decision = engine().classify(&IntakeRecord::new());

        assert_eq!(decision.risk_level(), RiskLevel::Low);
        assert_eq!(decision.department(), "General Practice");
        assert_eq!(decision.priority(), Priority::Normal);
        assert_eq!(decision.wait_estimate(), "30 minutes");
        assert_eq!(decision.explanations(), [ROUTINE_EXPLANATION]);
        assert_eq!(decision.confidence(), 0.8);
    }

    #[test]
    fn confidence_is_rounded_and_bounded() {
        let engine = RuleEngine::default().with_confidence_source(Arc::new(FixedConfidence(0.8372)));
        assert_eq!(engine.classify(&IntakeRecord::new()).confidence(), 0.84);

        let engine = RuleEngine::default();
        for _ in 0..200 {
            let confidence = engine.classify(&IntakeRecord::new()).confidence();
            assert!((0.75..=0.95).contains(&confidence));
        }
    }

    #[derive(Debug)]
    struct Unclamped(f64);

    impl ConfidenceSource for Unclamped {
        fn sample(&self, _range: ConfidenceRange) -> f64 {
            self.0
        }
    }

    #[test]
    fn non_finite_confidence_falls_back_to_range_floor() {
        let sources: [Arc<dyn ConfidenceSource>; 3] = [
            Arc::new(FixedConfidence(f64::NAN)),
            Arc::new(Unclamped(f64::INFINITY)),
            Arc::new(Unclamped(f64::NAN)),
        ];
        for source in sources {
            let decision = RuleEngine::default()
                .with_confidence_source(source)
                .classify(&IntakeRecord::new());
            assert!((decision.confidence() - 0.75).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn custom_thresholds_apply() {
        let mut config = RuleEngineConfig::default();
        config.thresholds.elevated_systolic = 130;
        let engine = RuleEngine::new(config).unwrap();

        let decision = engine.classify(&IntakeRecord::new().with_blood_pressure("135/85"));
        assert_eq!(decision.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn rule_validation_rejects_inconsistent_verdicts() {
        let err = TriageRule::new(
            "bad",
            RuleMatcher::SymptomsMention(vec!["x".into()]),
            RuleVerdict::new(RiskLevel::High, "Cardiology", Priority::Normal, "5 minutes"),
        )
        .expect_err("high risk in normal queue");
        assert!(matches!(err, RulesError::InvalidRule { .. }));

        let err = TriageRule::new(
            " ",
            RuleMatcher::SymptomsMention(Vec::new()),
            RuleVerdict::new(RiskLevel::Low, "GP", Priority::Normal, "30 minutes"),
        )
        .expect_err("blank name");
        assert!(matches!(err, RulesError::InvalidRule { .. }));
    }

    #[test]
    fn standard_table_is_ordered() {
        let engine = engine();
        let names: Vec<_> = engine.rules().iter().map(TriageRule::name).collect();
        assert_eq!(names, ["cardiac-symptoms", "critical-vitals", "elevated-vitals"]);
    }
}
