//! Session state threaded through the pipeline.
//!
//! One instance per run. The orchestrator owns it and hands it to each
//! stage as `&mut`; nothing here is persisted across runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::messages::ChatMessage;
use crate::types::metrics::MetricsRecord;
use crate::weather::WeatherContext;

/// Retrieved medical context plus the metrics it was retrieved for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedKnowledge {
    /// Newline-joined chunk texts; empty when nothing was retrieved
    pub text: String,
    /// Snapshot of the metrics at retrieval time
    pub metrics_snapshot: MetricsRecord,
}

/// The single mutable record for one end-to-end pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Diagnostic identity for this run only
    pub run_id: Uuid,

    /// Chat history; append-only during recommendation generation
    pub conversation: Vec<ChatMessage>,

    pub health_metrics: MetricsRecord,

    /// Populated once per session; never overwritten once the advisory
    /// is present
    pub weather_context: Option<WeatherContext>,

    pub retrieved_knowledge: Option<RetrievedKnowledge>,

    /// Exactly one entry per completed run
    pub recommendations: Vec<ChatMessage>,

    /// Full-so-far text of the recommendation being generated
    pub streaming_partial: String,

    /// Stage name -> one-line summary; diagnostic trail only
    pub stage_notes: HashMap<String, String>,
}

impl SessionState {
    /// Create a fresh session around a telemetry record
    pub fn new(health_metrics: MetricsRecord) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            conversation: Vec::new(),
            health_metrics,
            weather_context: None,
            retrieved_knowledge: None,
            recommendations: Vec::new(),
            streaming_partial: String::new(),
            stage_notes: HashMap::new(),
        }
    }

    /// Record a stage's one-line summary
    pub fn note(&mut self, stage: &str, summary: impl Into<String>) {
        self.stage_notes.insert(stage.to_string(), summary.into());
    }

    /// True once the weather context carries its advisory
    pub fn has_weather_advisory(&self) -> bool {
        self.weather_context
            .as_ref()
            .map(|w| w.advisory.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let state = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
        assert!(state.conversation.is_empty());
        assert!(state.weather_context.is_none());
        assert!(state.recommendations.is_empty());
        assert!(state.streaming_partial.is_empty());
        assert!(!state.has_weather_advisory());
    }

    #[test]
    fn test_distinct_run_ids() {
        let a = SessionState::new(MetricsRecord::default());
        let b = SessionState::new(MetricsRecord::default());
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_note_overwrites() {
        let mut state = SessionState::new(MetricsRecord::default());
        state.note("vitals", "first");
        state.note("vitals", "second");
        assert_eq!(state.stage_notes.get("vitals").unwrap(), "second");
    }
}
