//! Exercise advisory derivation.
//!
//! The advisory normally comes from an LLM call that is asked for a JSON
//! object with exactly four keys. Anything short of that — call failure,
//! unparseable reply, missing key — lands on the deterministic rule, never
//! on an error path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::streaming::first_json_object;

/// Conditions that raise the weather alert flag
const ALERT_CONDITIONS: [&str; 5] = ["rain", "drizzle", "snow", "storm", "foggy"];

/// Recommended exercise setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseSetting {
    Indoor,
    Outdoor,
}

/// Recommended exercise intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl fmt::Display for ExerciseSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExerciseSetting::Indoor => "Indoor",
            ExerciseSetting::Outdoor => "Outdoor",
        })
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intensity::Low => "Low",
            Intensity::Moderate => "Moderate",
            Intensity::High => "High",
        })
    }
}

/// Derived exercise guidance attached to a weather snapshot.
///
/// All four fields are required on deserialization, so a partial LLM reply
/// fails parsing as a whole and the fallback rule takes over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub exercise_recommendation: ExerciseSetting,
    pub intensity_level: Intensity,
    pub weather_alert: bool,
    pub reasoning: String,
}

/// How an advisory was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisoryOutcome {
    /// Parsed from the LLM reply
    Llm(Advisory),
    /// Computed by the deterministic rule
    Fallback { advisory: Advisory, reason: String },
}

impl AdvisoryOutcome {
    pub fn advisory(&self) -> &Advisory {
        match self {
            AdvisoryOutcome::Llm(a) => a,
            AdvisoryOutcome::Fallback { advisory, .. } => advisory,
        }
    }

    pub fn into_advisory(self) -> Advisory {
        match self {
            AdvisoryOutcome::Llm(a) => a,
            AdvisoryOutcome::Fallback { advisory, .. } => advisory,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AdvisoryOutcome::Fallback { .. })
    }
}

/// Deterministic advisory rule
pub fn fallback_advisory(temperature: f64, condition: &str) -> Advisory {
    let setting = if temperature > 30.0 || temperature < 5.0 {
        ExerciseSetting::Indoor
    } else {
        ExerciseSetting::Outdoor
    };

    let intensity = if (15.0..=25.0).contains(&temperature) {
        Intensity::Moderate
    } else {
        Intensity::Low
    };

    let alert = ALERT_CONDITIONS.contains(&condition.to_lowercase().as_str());

    let reasoning = format!(
        "Based on {}°C and {} conditions, recommend {} exercise at {} intensity.",
        temperature,
        condition,
        setting.to_string().to_lowercase(),
        intensity.to_string().to_lowercase(),
    );

    Advisory {
        exercise_recommendation: setting,
        intensity_level: intensity,
        weather_alert: alert,
        reasoning,
    }
}

/// Interpret an LLM reply, falling back to the rule when the reply is not
/// a JSON object carrying all four advisory keys.
pub fn from_llm_reply(reply: &str, temperature: f64, condition: &str) -> AdvisoryOutcome {
    let json = match first_json_object(reply) {
        Some(json) => json,
        None => {
            return AdvisoryOutcome::Fallback {
                advisory: fallback_advisory(temperature, condition),
                reason: "no JSON object in reply".to_string(),
            }
        }
    };

    match serde_json::from_str::<Advisory>(&json) {
        Ok(advisory) => AdvisoryOutcome::Llm(advisory),
        Err(e) => AdvisoryOutcome::Fallback {
            advisory: fallback_advisory(temperature, condition),
            reason: e.to_string(),
        },
    }
}
