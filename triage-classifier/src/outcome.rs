//! Interpretation of classifier output into a tagged [`Outcome`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use triage_primitives::{Priority, RiskLevel};

use crate::traits::{ClassifierError, RawOutput};

/// Longest stdout excerpt quoted in a malformed-output diagnostic.
const EXCERPT_LIMIT: usize = 200;

/// Why an invocation produced no usable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The process could not be started.
    SpawnError,
    /// The process did not exit in time and was killed.
    Timeout,
    /// The process exited with a non-zero code or was killed by a signal.
    NonZeroExit,
    /// The process exited cleanly but its output was not a JSON object.
    MalformedOutput,
}

impl FailureKind {
    /// Returns the snake-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpawnError => "spawn_error",
            Self::Timeout => "timeout",
            Self::NonZeroExit => "non_zero_exit",
            Self::MalformedOutput => "malformed_output",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed invocation: its category plus operator-facing detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationFailure {
    kind: FailureKind,
    diagnostic: String,
    exit_code: Option<i32>,
}

impl InvocationFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self {
            kind,
            diagnostic: diagnostic.into(),
            exit_code: None,
        }
    }

    /// Attaches the process exit code.
    #[must_use]
    pub const fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns diagnostic text intended for logs only.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Returns the exit code for [`FailureKind::NonZeroExit`] failures.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl From<ClassifierError> for InvocationFailure {
    fn from(err: ClassifierError) -> Self {
        let kind = match &err {
            ClassifierError::Spawn { .. } => FailureKind::SpawnError,
            ClassifierError::Timeout { .. } => FailureKind::Timeout,
            ClassifierError::Io { .. } | ClassifierError::OutputTooLarge { .. } => {
                FailureKind::MalformedOutput
            }
        };
        Self::new(kind, err.to_string())
    }
}

/// Recognised fields of a classifier's JSON reply.
///
/// Each field is extracted independently; a field that is missing or carries
/// an unusable value is `None` and never poisons the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierPayload {
    risk_level: Option<RiskLevel>,
    department: Option<String>,
    priority: Option<Priority>,
    wait_estimate: Option<String>,
    confidence: Option<f64>,
    explanations: Option<Vec<String>>,
    error: Option<String>,
}

impl ClassifierPayload {
    /// Extracts the recognised fields from a JSON object.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            risk_level: parse_label(object, "risk_level"),
            department: non_blank_text(object, "department"),
            priority: parse_label(object, "priority"),
            wait_estimate: non_blank_text(object, "wait_time"),
            confidence: unit_interval(object, "confidence"),
            explanations: explanation_list(object),
            error: object.get("error").and_then(truthy_text),
        }
    }

    /// Returns the risk level, if supplied.
    #[must_use]
    pub const fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_level
    }

    /// Returns the department, if supplied.
    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Returns the priority, if supplied.
    #[must_use]
    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Returns the wait estimate (`wait_time` on the wire), if supplied.
    #[must_use]
    pub fn wait_estimate(&self) -> Option<&str> {
        self.wait_estimate.as_deref()
    }

    /// Returns the confidence, if supplied and within `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Returns the explanations, if a non-empty list was supplied.
    #[must_use]
    pub fn explanations(&self) -> Option<&[String]> {
        self.explanations.as_deref()
    }

    /// Returns the model's error flag, if raised.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn parse_label<T>(object: &Map<String, Value>, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let text = object.get(key)?.as_str()?;
    match text.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(field = key, error = %err, "ignoring classifier field");
            None
        }
    }
}

fn non_blank_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)?
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_owned)
}

fn unit_interval(object: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = object.get(key)?.as_f64()?;
    if (0.0..=1.0).contains(&value) {
        Some(value)
    } else {
        warn!(field = key, value, "ignoring out-of-range classifier confidence");
        None
    }
}

fn explanation_list(object: &Map<String, Value>) -> Option<Vec<String>> {
    let items = object.get("explanations")?.as_array()?;
    let explanations: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect();
    (!explanations.is_empty()).then_some(explanations)
}

/// Mirrors JavaScript truthiness: `null`, `false`, `0` and `""` do not count.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Tagged result of one classifier invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Clean exit with a well-formed payload.
    Success(ClassifierPayload),
    /// Clean exit with a payload that flags an `error`.
    ModelWarning(ClassifierPayload),
    /// No usable payload.
    Failure(InvocationFailure),
}

impl Outcome {
    /// Convenience constructor for failures.
    #[must_use]
    pub fn failure(kind: FailureKind, diagnostic: impl Into<String>) -> Self {
        Self::Failure(InvocationFailure::new(kind, diagnostic))
    }

    /// Classifies the raw output of a process that ran to completion.
    #[must_use]
    pub fn from_raw(raw: &RawOutput) -> Self {
        match raw.exit_code() {
            Some(0) => {}
            Some(code) => {
                return Self::Failure(
                    InvocationFailure::new(FailureKind::NonZeroExit, raw.stderr_text())
                        .with_exit_code(code),
                );
            }
            None => {
                let stderr = raw.stderr_text();
                let diagnostic = if stderr.is_empty() {
                    "terminated by signal".to_owned()
                } else {
                    format!("terminated by signal: {stderr}")
                };
                return Self::failure(FailureKind::NonZeroExit, diagnostic);
            }
        }

        match serde_json::from_slice::<Value>(raw.stdout()) {
            Ok(Value::Object(object)) => {
                let payload = ClassifierPayload::from_object(&object);
                if payload.error().is_some() {
                    Self::ModelWarning(payload)
                } else {
                    Self::Success(payload)
                }
            }
            Ok(other) => Self::failure(
                FailureKind::MalformedOutput,
                format!("expected a JSON object, got {}", excerpt(&other.to_string())),
            ),
            Err(err) => Self::failure(
                FailureKind::MalformedOutput,
                format!(
                    "unparseable output ({err}): {}",
                    excerpt(&String::from_utf8_lossy(raw.stdout()))
                ),
            ),
        }
    }

    /// Returns the failure category, if this is a failure.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failure(failure) => Some(failure.kind),
            Self::Success(_) | Self::ModelWarning(_) => None,
        }
    }

    /// Returns the payload for success and warning outcomes.
    #[must_use]
    pub const fn payload(&self) -> Option<&ClassifierPayload> {
        match self {
            Self::Success(payload) | Self::ModelWarning(payload) => Some(payload),
            Self::Failure(_) => None,
        }
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_LIMIT) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exited(code: i32, stdout: &str) -> RawOutput {
        RawOutput::new(Some(code), stdout, "model missing\n")
    }

    #[test]
    fn clean_json_is_success() {
        let outcome = Outcome::from_raw(&exited(
            0,
            r#"{"risk_level":"High","department":"Cardiology","priority":"Emergency","wait_time":"10 mins","confidence":0.97,"explanations":["a","b"]}"#,
        ));

        let Outcome::Success(payload) = outcome else {
            panic!("expected success");
        };
        assert_eq!(payload.risk_level(), Some(RiskLevel::High));
        assert_eq!(payload.department(), Some("Cardiology"));
        assert_eq!(payload.priority(), Some(Priority::Emergency));
        assert_eq!(payload.wait_estimate(), Some("10 mins"));
        assert_eq!(payload.confidence(), Some(0.97));
        assert_eq!(payload.explanations().unwrap(), ["a", "b"]);
    }

    #[test]
    fn error_field_marks_a_warning() {
        let outcome = Outcome::from_raw(&exited(
            0,
            r#"{"risk_level":"Medium","confidence":0.0,"error":"Model file not found"}"#,
        ));

        let Outcome::ModelWarning(payload) = outcome else {
            panic!("expected warning");
        };
        assert_eq!(payload.error(), Some("Model file not found"));
        assert_eq!(payload.confidence(), Some(0.0));
    }

    #[test]
    fn falsy_error_values_do_not_warn() {
        for error in [json!(null), json!(""), json!(false), json!(0)] {
            let stdout = json!({ "risk_level": "Low", "error": error }).to_string();
            assert!(matches!(
                Outcome::from_raw(&exited(0, &stdout)),
                Outcome::Success(_)
            ));
        }
    }

    #[test]
    fn non_zero_exit_carries_stderr() {
        let outcome = Outcome::from_raw(&exited(1, r#"{"risk_level":"High"}"#));

        let Outcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind(), FailureKind::NonZeroExit);
        assert_eq!(failure.diagnostic(), "model missing");
        assert_eq!(failure.exit_code(), Some(1));
    }

    #[test]
    fn signal_termination_is_a_non_zero_exit() {
        let outcome = Outcome::from_raw(&RawOutput::new(None, "", ""));
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NonZeroExit));
    }

    #[test]
    fn malformed_output_variants() {
        for stdout in ["", "not json", "[1,2,3]", "\"text\"", "{\"risk_level\":"] {
            assert_eq!(
                Outcome::from_raw(&exited(0, stdout)).failure_kind(),
                Some(FailureKind::MalformedOutput),
                "stdout {stdout:?}"
            );
        }
    }

    #[test]
    fn unusable_fields_are_dropped_individually() {
        let object = json!({
            "risk_level": "Critical",
            "department": "  ",
            "priority": 3,
            "wait_time": "",
            "confidence": 1.7,
            "explanations": [],
        });
        let payload = ClassifierPayload::from_object(object.as_object().unwrap());

        assert_eq!(payload, ClassifierPayload::default());
    }

    #[test]
    fn transport_errors_map_to_categories() {
        let cases = [
            (ClassifierError::spawn("no such file"), FailureKind::SpawnError),
            (
                ClassifierError::Timeout {
                    after: std::time::Duration::from_secs(1),
                },
                FailureKind::Timeout,
            ),
            (ClassifierError::io("broken"), FailureKind::MalformedOutput),
            (
                ClassifierError::OutputTooLarge { limit: 10 },
                FailureKind::MalformedOutput,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(InvocationFailure::from(err).kind(), kind);
        }
    }

    #[test]
    fn long_output_is_excerpted() {
        let text = "x".repeat(1000);
        let quoted = excerpt(&text);
        assert_eq!(quoted.len(), EXCERPT_LIMIT + 3);
    }
}
