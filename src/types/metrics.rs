//! Health telemetry records and vitals classification results.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::weather::WeatherContext;

/// Raw health telemetry for one pipeline run.
///
/// The input contract requires `heart_rate`, `sleep_hours` and `steps`;
/// 7-day-average variants are optional and take precedence when present.
/// Unknown fields (calories, device timestamps, ...) are preserved in
/// `extra` so a richer record survives the round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(default)]
    pub heart_rate: f64,
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub steps: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_avg_7d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours_avg_7d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_avg_7d: Option<u64>,

    /// Written by the vitals evaluator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals_status: Option<VitalsStatus>,

    /// Weather context mirrored in for downstream consumers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_impact: Option<WeatherContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetricsRecord {
    /// Build a record from the three canonical readings
    pub fn new(heart_rate: f64, sleep_hours: f64, steps: u64) -> Self {
        Self {
            heart_rate,
            sleep_hours,
            steps,
            ..Default::default()
        }
    }

    /// Generate a synthetic telemetry record, jittered around a healthy
    /// adult baseline. Stands in for a wearable-device feed.
    pub fn synthetic() -> Self {
        let mut rng = rand::thread_rng();

        let mut extra = Map::new();
        extra.insert(
            "calories".to_string(),
            Value::from(rng.gen_range(1800..=2400)),
        );
        extra.insert(
            "last_updated".to_string(),
            Value::from(Utc::now().to_rfc3339()),
        );

        Self {
            heart_rate: rng.gen_range(65..=85) as f64,
            sleep_hours: (rng.gen_range(130..=170) as f64) / 20.0,
            steps: rng.gen_range(6500..=11_000),
            extra,
            ..Default::default()
        }
    }
}

/// Categorical status for every vital, exactly one per metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsStatus {
    pub heart_rate: VitalSign,
    pub sleep: SleepQuality,
    pub activity: ActivityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalSign {
    Normal,
    Abnormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepQuality {
    Optimal,
    Suboptimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Active,
    Sedentary,
}

impl fmt::Display for VitalSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VitalSign::Normal => "Normal",
            VitalSign::Abnormal => "Abnormal",
        })
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SleepQuality::Optimal => "Optimal",
            SleepQuality::Suboptimal => "Suboptimal",
        })
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivityLevel::Active => "Active",
            ActivityLevel::Sedentary => "Sedentary",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_with_aliases() {
        let json = r#"{
            "heart_rate": 72.0,
            "sleep_hours": 8.0,
            "steps": 9000,
            "heart_rate_avg_7d": 70.5,
            "calories": 2100
        }"#;

        let record: MetricsRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.heart_rate, 72.0);
        assert_eq!(record.heart_rate_avg_7d, Some(70.5));
        assert_eq!(record.extra.get("calories"), Some(&Value::from(2100)));
    }

    #[test]
    fn test_record_missing_fields_default_to_zero() {
        let record: MetricsRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.heart_rate, 0.0);
        assert_eq!(record.sleep_hours, 0.0);
        assert_eq!(record.steps, 0);
        assert!(record.vitals_status.is_none());
    }

    #[test]
    fn test_synthetic_record_shape() {
        let record = MetricsRecord::synthetic();
        assert!(record.heart_rate >= 65.0 && record.heart_rate <= 85.0);
        assert!(record.sleep_hours >= 6.5 && record.sleep_hours <= 8.5);
        assert!(record.steps >= 6500 && record.steps <= 11_000);
        assert!(record.extra.contains_key("calories"));
        assert!(record.extra.contains_key("last_updated"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(VitalSign::Normal.to_string(), "Normal");
        assert_eq!(SleepQuality::Suboptimal.to_string(), "Suboptimal");
        assert_eq!(ActivityLevel::Sedentary.to_string(), "Sedentary");
    }
}
