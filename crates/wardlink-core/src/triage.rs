//! Priority triage engine.
//!
//! Pure classification of an inbound clinical event into an ordered urgency
//! tier. The engine holds no state and performs no I/O: the resolved tier is
//! a deterministic function of the declared urgency tag and vital signs, so
//! identical inputs always resolve to the identical tier.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. `CODE_BLUE` tag, heart rate < 40 bpm, or SpO₂ < 85 % → `Critical`
//! 2. `PAIN_SEVERE` tag or temperature > 102 °F → `High`
//! 3. `ASSISTANCE` tag → `Normal`
//! 4. anything else → `Low`
//!
//! Missing vital readings never trigger their threshold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Emergency code for cardiac/respiratory arrest; always critical.
pub const CODE_BLUE: &str = "CODE_BLUE";
/// Urgency tag for severe-pain bedside calls.
pub const PAIN_SEVERE: &str = "PAIN_SEVERE";
/// Urgency tag for routine assistance requests.
pub const ASSISTANCE: &str = "ASSISTANCE";

/// Heart rate below this threshold resolves critical (bpm).
pub const CRITICAL_HEART_RATE_BPM: f32 = 40.0;
/// Oxygen saturation below this threshold resolves critical (percent).
pub const CRITICAL_SPO2_PCT: f32 = 85.0;
/// Temperature above this threshold resolves high (degrees Fahrenheit).
pub const HIGH_TEMPERATURE_F: f32 = 102.0;

/// Urgency tier produced by the triage engine.
///
/// Variants are declared in ascending urgency so the derived `Ord` follows
/// the tier ordering (`Low < Normal < High < Critical`). Serializes to the
/// uppercase tier vocabulary; lowercase message-priority spellings are
/// accepted on input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "normal")]
    Normal,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl Priority {
    /// Returns the uppercase tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            "CRITICAL" => Ok(Priority::Critical),
            other => Err(CoreError::invalid_priority(other)),
        }
    }
}

/// Vital signs declared with a bedside call.
///
/// Every reading is optional; a missing reading is treated as not triggering
/// its threshold, never coerced to a triggering value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSigns {
    #[serde(rename = "heartRate", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f32>,
    #[serde(
        rename = "spo2",
        alias = "oxygenSaturation",
        skip_serializing_if = "Option::is_none"
    )]
    pub oxygen_saturation: Option<f32>,
    #[serde(
        rename = "temp",
        alias = "temperature",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f32>,
}

impl VitalSigns {
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_none() && self.oxygen_saturation.is_none() && self.temperature.is_none()
    }
}

/// Resolve the tier for a known emergency code.
///
/// This is the tag column of the [`classify`] rule table. Returns `None` for
/// tags outside the known code set so callers (the alert broadcast manager)
/// can substitute their configured baseline tier instead of the `Low`
/// fall-through.
pub fn code_priority(tag: &str) -> Option<Priority> {
    match tag {
        CODE_BLUE => Some(Priority::Critical),
        PAIN_SEVERE => Some(Priority::High),
        ASSISTANCE => Some(Priority::Normal),
        _ => None,
    }
}

/// Classify an inbound clinical event into an urgency tier.
///
/// Tag matching is exact and case-sensitive; vitals thresholds interleave
/// with the code matching in the fixed rule order documented at module level.
pub fn classify(urgency_tag: &str, vitals: &VitalSigns) -> Priority {
    let below = |reading: Option<f32>, limit: f32| reading.is_some_and(|v| v < limit);
    let above = |reading: Option<f32>, limit: f32| reading.is_some_and(|v| v > limit);

    if urgency_tag == CODE_BLUE
        || below(vitals.heart_rate, CRITICAL_HEART_RATE_BPM)
        || below(vitals.oxygen_saturation, CRITICAL_SPO2_PCT)
    {
        Priority::Critical
    } else if urgency_tag == PAIN_SEVERE || above(vitals.temperature, HIGH_TEMPERATURE_F) {
        Priority::High
    } else if urgency_tag == ASSISTANCE {
        Priority::Normal
    } else {
        Priority::Low
    }
}
