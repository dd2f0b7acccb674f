//! Decision table configuration: vital-sign defaults, thresholds, and the
//! confidence range.

use serde::{Deserialize, Serialize};
use triage_primitives::IntakeRecord;

use crate::engine::{RulesError, RulesResult};

/// Systolic pressure assumed when no usable reading was supplied.
pub const DEFAULT_SYSTOLIC: i64 = 120;
/// Diastolic pressure assumed when no usable reading was supplied.
pub const DEFAULT_DIASTOLIC: i64 = 80;
/// Heart rate (bpm) assumed when none was supplied.
pub const DEFAULT_HEART_RATE: f64 = 70.0;
/// Body temperature (°F) assumed when none was supplied.
pub const DEFAULT_TEMPERATURE_F: f64 = 98.6;

/// Population-normal vitals substituted for missing measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VitalDefaults {
    /// Systolic pressure in mmHg.
    pub systolic: i64,
    /// Diastolic pressure in mmHg.
    pub diastolic: i64,
    /// Heart rate in bpm.
    pub heart_rate: f64,
    /// Body temperature in °F.
    pub temperature: f64,
}

impl Default for VitalDefaults {
    fn default() -> Self {
        Self {
            systolic: DEFAULT_SYSTOLIC,
            diastolic: DEFAULT_DIASTOLIC,
            heart_rate: DEFAULT_HEART_RATE,
            temperature: DEFAULT_TEMPERATURE_F,
        }
    }
}

/// Strict upper bounds; a reading *above* a bound triggers the rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Systolic pressure above which vitals are critical.
    pub critical_systolic: i64,
    /// Heart rate above which vitals are critical.
    pub critical_heart_rate: f64,
    /// Temperature above which vitals are critical.
    pub critical_temperature: f64,
    /// Systolic pressure above which vitals are elevated.
    pub elevated_systolic: i64,
    /// Temperature above which vitals are elevated.
    pub elevated_temperature: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_systolic: 160,
            critical_heart_rate: 110.0,
            critical_temperature: 103.0,
            elevated_systolic: 140,
            elevated_temperature: 101.0,
        }
    }
}

/// Inclusive range the baseline confidence is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceRange {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl ConfidenceRange {
    /// Creates a range, validating `0 <= low <= high <= 1`.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidConfig`] for an empty or out-of-bounds range.
    pub fn new(low: f64, high: f64) -> RulesResult<Self> {
        let range = Self { low, high };
        range.validate()?;
        Ok(range)
    }

    /// Clamps `value` into the range.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    /// Returns `true` when `value` lies inside the range.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }

    fn validate(self) -> RulesResult<()> {
        if !(self.low.is_finite() && self.high.is_finite()) {
            return Err(RulesError::InvalidConfig("confidence bounds must be finite"));
        }
        if self.low < 0.0 || self.high > 1.0 {
            return Err(RulesError::InvalidConfig(
                "confidence bounds must lie within [0, 1]",
            ));
        }
        if self.low > self.high {
            return Err(RulesError::InvalidConfig(
                "confidence lower bound exceeds upper bound",
            ));
        }
        Ok(())
    }
}

impl Default for ConfidenceRange {
    fn default() -> Self {
        Self {
            low: 0.75,
            high: 0.95,
        }
    }
}

/// Complete rule engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleEngineConfig {
    /// Vitals substituted for missing readings.
    pub defaults: VitalDefaults,
    /// Rule trigger points.
    pub thresholds: Thresholds,
    /// Baseline confidence range.
    pub confidence: ConfidenceRange,
}

impl RuleEngineConfig {
    /// Checks that thresholds are ordered and the confidence range is sane.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> RulesResult<()> {
        let t = &self.thresholds;
        if t.elevated_systolic > t.critical_systolic {
            return Err(RulesError::InvalidConfig(
                "elevated systolic threshold exceeds critical threshold",
            ));
        }
        if t.elevated_temperature > t.critical_temperature {
            return Err(RulesError::InvalidConfig(
                "elevated temperature threshold exceeds critical threshold",
            ));
        }
        if !(t.critical_heart_rate.is_finite()
            && t.critical_temperature.is_finite()
            && t.elevated_temperature.is_finite())
        {
            return Err(RulesError::InvalidConfig("thresholds must be finite"));
        }
        self.confidence.validate()
    }
}

/// Vital signs with defaults applied, as seen by the decision table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    /// Systolic pressure in mmHg.
    pub systolic: i64,
    /// Diastolic pressure in mmHg.
    pub diastolic: i64,
    /// Heart rate in bpm.
    pub heart_rate: f64,
    /// Body temperature in °F.
    pub temperature: f64,
}

impl Vitals {
    /// Resolves the intake's vitals, substituting defaults for anything absent
    /// or unparseable.
    #[must_use]
    pub fn resolve(intake: &IntakeRecord, defaults: &VitalDefaults) -> Self {
        let reading = intake.blood_pressure_reading();
        Self {
            systolic: reading.map_or(defaults.systolic, |bp| bp.systolic()),
            diastolic: reading
                .and_then(|bp| bp.diastolic())
                .unwrap_or(defaults.diastolic),
            heart_rate: intake.heart_rate().unwrap_or(defaults.heart_rate),
            temperature: intake.temperature().unwrap_or(defaults.temperature),
        }
    }
}
