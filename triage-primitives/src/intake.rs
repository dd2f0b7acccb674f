//! Patient intake record submitted for triage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result, lenient};

/// Caller-supplied patient data.
///
/// Every field is optional. Vital signs that were not supplied stay `None` so
/// that serialized output never carries values the caller did not send; rule
/// evaluation applies its own defaults. Unknown keys are preserved verbatim in
/// [`IntakeRecord::extra`] and written back out on serialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRecord {
    #[serde(
        default,
        deserialize_with = "lenient::number",
        serialize_with = "lenient::serialize_number",
        skip_serializing_if = "Option::is_none"
    )]
    age: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    symptoms: Option<String>,
    #[serde(
        default,
        rename = "bp",
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    blood_pressure: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        serialize_with = "lenient::serialize_number",
        skip_serializing_if = "Option::is_none"
    )]
    heart_rate: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        serialize_with = "lenient::serialize_number",
        skip_serializing_if = "Option::is_none"
    )]
    temperature: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    gender: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    history: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl IntakeRecord {
    /// Creates an empty intake record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an intake record from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIntake`] when the input is not valid JSON or is
    /// not a JSON object.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|err| Error::invalid_intake(format!("malformed JSON: {err}")))?;
        Self::from_value(value)
    }

    /// Interprets an already-parsed JSON value as an intake record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIntake`] when the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_intake("expected a JSON object"));
        }
        serde_json::from_value(value).map_err(|err| Error::invalid_intake(err.to_string()))
    }

    /// Serializes the record into the JSON object handed to classifiers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIntake`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| Error::invalid_intake(err.to_string()))
    }

    /// Sets the patient age.
    #[must_use]
    pub fn with_age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }

    /// Sets the free-text symptom description.
    #[must_use]
    pub fn with_symptoms(mut self, symptoms: impl Into<String>) -> Self {
        self.symptoms = Some(symptoms.into());
        self
    }

    /// Sets the blood pressure reading in `systolic/diastolic` form.
    #[must_use]
    pub fn with_blood_pressure(mut self, reading: impl Into<String>) -> Self {
        self.blood_pressure = Some(reading.into());
        self
    }

    /// Sets the heart rate in beats per minute.
    #[must_use]
    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    /// Sets the body temperature in degrees Fahrenheit.
    #[must_use]
    pub fn with_temperature(mut self, fahrenheit: f64) -> Self {
        self.temperature = Some(fahrenheit);
        self
    }

    /// Sets the patient name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the patient gender.
    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Sets the free-text medical history.
    #[must_use]
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.history = Some(history.into());
        self
    }

    /// Attaches an additional pass-through field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns the patient age.
    #[must_use]
    pub const fn age(&self) -> Option<f64> {
        self.age
    }

    /// Returns the symptom description.
    #[must_use]
    pub fn symptoms(&self) -> Option<&str> {
        self.symptoms.as_deref()
    }

    /// Returns the raw blood pressure text.
    #[must_use]
    pub fn blood_pressure(&self) -> Option<&str> {
        self.blood_pressure.as_deref()
    }

    /// Returns the parsed blood pressure, if the raw text is usable.
    #[must_use]
    pub fn blood_pressure_reading(&self) -> Option<BloodPressure> {
        self.blood_pressure.as_deref().and_then(BloodPressure::parse)
    }

    /// Returns the heart rate.
    #[must_use]
    pub const fn heart_rate(&self) -> Option<f64> {
        self.heart_rate
    }

    /// Returns the body temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Returns the patient name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the patient gender.
    #[must_use]
    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    /// Returns the medical history text.
    #[must_use]
    pub fn history(&self) -> Option<&str> {
        self.history.as_deref()
    }

    /// Returns fields that carry no meaning for triage and pass through.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Blood pressure reading parsed from `systolic/diastolic` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloodPressure {
    systolic: i64,
    diastolic: Option<i64>,
}

impl BloodPressure {
    /// Parses the leading integer of each `/`-separated component.
    ///
    /// `"150/90"`, `" 150 / 90 "` and `"150mmHg/90"` all yield a systolic of
    /// 150. Returns `None` when no systolic integer can be read.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.splitn(2, '/');
        let systolic = parts.next().and_then(leading_integer)?;
        let diastolic = parts.next().and_then(leading_integer);
        Some(Self {
            systolic,
            diastolic,
        })
    }

    /// Returns the systolic pressure in mmHg.
    #[must_use]
    pub const fn systolic(self) -> i64 {
        self.systolic
    }

    /// Returns the diastolic pressure in mmHg, if present.
    #[must_use]
    pub const fn diastolic(self) -> Option<i64> {
        self.diastolic
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| sign * value)
}
