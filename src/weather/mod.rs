//! Weather advisory component.
//!
//! Fetches current conditions for a coordinate and derives exercise
//! guidance. The contract is infallible: any forecast-service failure
//! substitutes documented defaults, and any LLM failure lands on the
//! deterministic rule, so the pipeline never stalls on weather.

pub mod advisory;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::WeatherConfig;
use crate::errors::{PipelineError, Result};
use crate::streaming::TextGenerator;

pub use advisory::{
    fallback_advisory, from_llm_reply, Advisory, AdvisoryOutcome, ExerciseSetting, Intensity,
};

/// Defaults used when the forecast service is unavailable
const DEFAULT_TEMPERATURE: f64 = 20.0;
const DEFAULT_HUMIDITY: f64 = 50.0;
const DEFAULT_CONDITION: &str = "Unknown";

/// Weather snapshot plus its derived advisory.
///
/// `advisory` is either fully present or absent; partial advisories are
/// never constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature: f64,
    pub humidity: f64,
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

/// Map a WMO weather code to a human-readable label
pub fn condition_label(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        61 => "Light rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        _ => "Unknown",
    }
}

/// Weather advisory service handle
pub struct WeatherAdvisor {
    http: Client,
    llm: Arc<dyn TextGenerator>,
    config: WeatherConfig,
}

impl WeatherAdvisor {
    pub fn new(llm: Arc<dyn TextGenerator>, config: WeatherConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self { http, llm, config })
    }

    /// Fetch current conditions and attach an exercise advisory.
    ///
    /// Never fails: service problems degrade to defaults, LLM problems
    /// degrade to the rule-based advisory.
    pub async fn advise(&self, latitude: f64, longitude: f64) -> WeatherContext {
        let (temperature, humidity, condition) =
            match self.fetch_current(latitude, longitude).await {
                Ok(current) => current,
                Err(e) => {
                    eprintln!("[WEATHER] Error retrieving weather data: {}", e);
                    (
                        DEFAULT_TEMPERATURE,
                        DEFAULT_HUMIDITY,
                        DEFAULT_CONDITION.to_string(),
                    )
                }
            };

        let outcome = match self.llm.complete(&advisory_prompt(temperature, humidity, &condition)).await {
            Ok(reply) => from_llm_reply(&reply, temperature, &condition),
            Err(e) => AdvisoryOutcome::Fallback {
                advisory: fallback_advisory(temperature, &condition),
                reason: e.to_string(),
            },
        };

        if let AdvisoryOutcome::Fallback { reason, .. } = &outcome {
            eprintln!("[WEATHER] LLM advisory failed ({}), using rule-based fallback", reason);
        }

        WeatherContext {
            temperature,
            humidity,
            condition,
            advisory: Some(outcome.into_advisory()),
        }
    }

    async fn fetch_current(&self, latitude: f64, longitude: f64) -> Result<(f64, f64, String)> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,weather_code".to_string(),
                ),
                ("timezone", self.config.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::WeatherApi(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::WeatherApi(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::WeatherApi(format!("malformed body: {}", e)))?;

        let current = body
            .current
            .ok_or_else(|| PipelineError::WeatherApi("missing current conditions".to_string()))?;

        Ok((
            current.temperature_2m.unwrap_or(DEFAULT_TEMPERATURE),
            current.relative_humidity_2m.unwrap_or(DEFAULT_HUMIDITY),
            condition_label(current.weather_code.unwrap_or(0)).to_string(),
        ))
    }
}

fn advisory_prompt(temperature: f64, humidity: f64, condition: &str) -> String {
    format!(
        "Analyze weather conditions (Temperature: {}°C, Condition: {}, Humidity: {}%) \
         and provide exercise recommendations in JSON format with these exact keys:\n\
         - exercise_recommendation: \"Indoor\" or \"Outdoor\"\n\
         - intensity_level: \"Low\", \"Moderate\", or \"High\"\n\
         - weather_alert: true or false\n\
         - reasoning: brief explanation\n\
         Return only JSON.",
        temperature, condition, humidity
    )
}

/// Forecast service response body
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    weather_code: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_label_known_codes() {
        assert_eq!(condition_label(0), "Clear sky");
        assert_eq!(condition_label(3), "Overcast");
        assert_eq!(condition_label(45), "Foggy");
        assert_eq!(condition_label(65), "Heavy rain");
    }

    #[test]
    fn test_condition_label_unknown_code() {
        assert_eq!(condition_label(99), "Unknown");
        assert_eq!(condition_label(42), "Unknown");
    }

    #[test]
    fn test_forecast_body_partial_fields() {
        let body: ForecastResponse =
            serde_json::from_str(r#"{"current": {"temperature_2m": 12.5}}"#).unwrap();
        let current = body.current.unwrap();
        assert_eq!(current.temperature_2m, Some(12.5));
        assert!(current.weather_code.is_none());
    }

    #[test]
    fn test_weather_context_without_advisory_roundtrip() {
        let ctx = WeatherContext {
            temperature: 20.0,
            humidity: 50.0,
            condition: "Unknown".to_string(),
            advisory: None,
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(!json.contains("advisory"));
        let back: WeatherContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_advisory_prompt_embeds_conditions() {
        let prompt = advisory_prompt(28.0, 40.0, "Overcast");
        assert!(prompt.contains("28"));
        assert!(prompt.contains("Overcast"));
        assert!(prompt.contains("exercise_recommendation"));
    }
}
