//! Vitals evaluation stage.
//!
//! Classifies the three canonical metrics against configured bounds and
//! makes sure a weather advisory is present before downstream stages need
//! it. This stage cannot fail: absent inputs default to zero and the
//! weather component degrades internally.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::config::Thresholds;
use crate::errors::Result;
use crate::stages::Stage;
use crate::types::{
    ActivityLevel, MetricsRecord, SessionState, SleepQuality, VitalSign, VitalsStatus,
};
use crate::weather::WeatherAdvisor;

pub const STAGE_NAME: &str = "vitals";

/// Classify heart rate against the configured normal range (inclusive)
pub fn classify_heart_rate(heart_rate: f64, thresholds: &Thresholds) -> VitalSign {
    if heart_rate >= thresholds.heart_rate_min && heart_rate <= thresholds.heart_rate_max {
        VitalSign::Normal
    } else {
        VitalSign::Abnormal
    }
}

/// Classify sleep duration against the configured optimal range (inclusive)
pub fn classify_sleep(sleep_hours: f64, thresholds: &Thresholds) -> SleepQuality {
    if sleep_hours >= thresholds.sleep_min && sleep_hours <= thresholds.sleep_max {
        SleepQuality::Optimal
    } else {
        SleepQuality::Suboptimal
    }
}

/// Classify step count against the configured activity threshold
pub fn classify_activity(steps: u64, thresholds: &Thresholds) -> ActivityLevel {
    if steps >= thresholds.activity_steps {
        ActivityLevel::Active
    } else {
        ActivityLevel::Sedentary
    }
}

/// When a 7-day-average feed is present, prefer it wholesale and mirror
/// the averages into the canonical keys for downstream consumers.
pub fn resolve_canonical(metrics: &mut MetricsRecord) {
    if let Some(heart_rate) = metrics.heart_rate_avg_7d {
        metrics.heart_rate = heart_rate;
        metrics.sleep_hours = metrics.sleep_hours_avg_7d.unwrap_or(0.0);
        metrics.steps = metrics.steps_avg_7d.unwrap_or(0);
    }
}

/// Vitals evaluator stage
pub struct VitalsEvaluator {
    advisor: Arc<WeatherAdvisor>,
    thresholds: Thresholds,
    default_coordinate: (f64, f64),
}

impl VitalsEvaluator {
    pub fn new(
        advisor: Arc<WeatherAdvisor>,
        thresholds: Thresholds,
        default_coordinate: (f64, f64),
    ) -> Self {
        Self {
            advisor,
            thresholds,
            default_coordinate,
        }
    }
}

#[async_trait]
impl Stage for VitalsEvaluator {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn process(&self, state: &mut SessionState) -> Result<()> {
        resolve_canonical(&mut state.health_metrics);

        let status = VitalsStatus {
            heart_rate: classify_heart_rate(state.health_metrics.heart_rate, &self.thresholds),
            sleep: classify_sleep(state.health_metrics.sleep_hours, &self.thresholds),
            activity: classify_activity(state.health_metrics.steps, &self.thresholds),
        };

        // Seed the weather context if nothing upstream provided a complete
        // advisory; an existing advisory is never recomputed.
        if !state.has_weather_advisory() {
            let (latitude, longitude) = self.default_coordinate;
            state.weather_context = Some(self.advisor.advise(latitude, longitude).await);
        }

        state.health_metrics.vitals_status = Some(status);
        state.health_metrics.weather_impact = state.weather_context.clone();
        state.health_metrics.last_processed = Some(Utc::now());

        state.note(
            STAGE_NAME,
            format!(
                "Analyzed vitals: HR {}, Sleep {}, Activity {}",
                status.heart_rate, status.sleep, status.activity
            ),
        );

        Ok(())
    }
}
