//! Recommendation generation stage.
//!
//! Folds everything the earlier stages collected into one prompt and
//! streams the reply. Each increment replaces `streaming_partial` with
//! the full-so-far text and is published to the observer channel, so a
//! caller can watch the recommendation grow. One invocation per run, no
//! retries.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::errors::Result;
use crate::stages::Stage;
use crate::streaming::TextGenerator;
use crate::types::{ChatMessage, SessionState};

pub const STAGE_NAME: &str = "recommendation";

/// Assemble the generation prompt from the accumulated session context
pub fn build_prompt(state: &SessionState) -> String {
    let metrics = &state.health_metrics;

    let knowledge = state
        .retrieved_knowledge
        .as_ref()
        .filter(|k| !k.text.is_empty())
        .map(|k| k.text.as_str())
        .unwrap_or("No medical context available");

    let (hr_status, sleep_status, activity_status) = match metrics.vitals_status {
        Some(status) => (
            status.heart_rate.to_string(),
            status.sleep.to_string(),
            status.activity.to_string(),
        ),
        None => (
            "Unknown".to_string(),
            "Unknown".to_string(),
            "Unknown".to_string(),
        ),
    };

    let weather = state.weather_context.as_ref();
    let condition = weather.map(|w| w.condition.as_str()).unwrap_or("Unknown");
    let temperature = weather.map(|w| w.temperature).unwrap_or(0.0);
    let advisory = weather.and_then(|w| w.advisory.as_ref());
    let setting = advisory
        .map(|a| a.exercise_recommendation.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let intensity = advisory
        .map(|a| a.intensity_level.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let alert = advisory
        .map(|a| if a.weather_alert { "Yes" } else { "None" })
        .unwrap_or("None");
    let rationale = advisory.map(|a| a.reasoning.as_str()).unwrap_or("");

    format!(
        "As a health recommendation assistant, generate personalized health advice.\n\
         \n\
         Medical Knowledge: {knowledge}\n\
         \n\
         Current Health Metrics:\n\
         - Heart Rate: {hr} bpm - Status: {hr_status}\n\
         - Sleep: {sleep} hours - Status: {sleep_status}\n\
         - Steps: {steps} - Status: {activity_status}\n\
         \n\
         Weather Analysis:\n\
         - Current Weather: {condition} at {temperature}°C\n\
         - Recommended Location: {setting}\n\
         - Suggested Intensity: {intensity}\n\
         - Weather Alerts: {alert}\n\
         - Weather Assessment: {rationale}\n\
         \n\
         Provide actionable recommendations for activity, nutrition, and \
         sleep, with special focus on {setting} activities at {intensity} \
         intensity.",
        knowledge = knowledge,
        hr = metrics.heart_rate,
        hr_status = hr_status,
        sleep = metrics.sleep_hours,
        sleep_status = sleep_status,
        steps = metrics.steps,
        activity_status = activity_status,
        condition = condition,
        temperature = temperature,
        setting = setting,
        intensity = intensity,
        alert = alert,
        rationale = rationale,
    )
}

/// Recommendation generator stage
pub struct RecommendationGenerator {
    llm: Arc<dyn TextGenerator>,
    observer: Option<UnboundedSender<String>>,
}

impl RecommendationGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm,
            observer: None,
        }
    }

    /// Publish every running total to `observer` during generation
    pub fn with_observer(llm: Arc<dyn TextGenerator>, observer: UnboundedSender<String>) -> Self {
        Self {
            llm,
            observer: Some(observer),
        }
    }

    fn publish(&self, full_so_far: &str) {
        if let Some(observer) = &self.observer {
            // A dropped receiver just means nobody is watching
            let _ = observer.send(full_so_far.to_string());
        }
    }

    fn finish(&self, state: &mut SessionState, text: String) {
        state.conversation.push(ChatMessage::assistant(text.clone()));
        state.recommendations.push(ChatMessage::assistant(text));
    }
}

#[async_trait]
impl Stage for RecommendationGenerator {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn process(&self, state: &mut SessionState) -> Result<()> {
        let prompt = build_prompt(state);
        state.conversation.push(ChatMessage::user(prompt.clone()));
        state.streaming_partial.clear();

        let mut stream = match self.llm.stream(&prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("[RECOMMEND] Generation failed before streaming: {}", e);
                self.finish(
                    state,
                    format!("Recommendation generation failed: {}", e),
                );
                state.note(STAGE_NAME, format!("Generation failed: {}", e));
                return Ok(());
            }
        };

        let mut full = String::new();
        loop {
            match stream.next_delta().await {
                Ok(Some(delta)) => {
                    full.push_str(&delta);
                    state.streaming_partial = full.clone();
                    self.publish(&full);
                }
                Ok(None) => break,
                Err(e) if full.is_empty() => {
                    eprintln!("[RECOMMEND] Generation failed before any output: {}", e);
                    self.finish(
                        state,
                        format!("Recommendation generation failed: {}", e),
                    );
                    state.note(STAGE_NAME, format!("Generation failed: {}", e));
                    return Ok(());
                }
                Err(e) => {
                    // Keep what was generated; the partial text is still a
                    // readable recommendation.
                    eprintln!("[RECOMMEND] Stream interrupted: {}", e);
                    self.finish(state, full.clone());
                    state.note(STAGE_NAME, format!("Stream interrupted: {}", e));
                    return Ok(());
                }
            }
        }

        let setting = state
            .weather_context
            .as_ref()
            .and_then(|w| w.advisory.as_ref())
            .map(|a| a.exercise_recommendation.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        self.finish(state, full);
        state.note(
            STAGE_NAME,
            format!(
                "Generated personalized health plan (recommending {} activities)",
                setting
            ),
        );

        Ok(())
    }
}
