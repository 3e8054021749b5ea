//! End-to-end pipeline tests.
//!
//! All external services are replaced: the LLM with scripted generators,
//! the similarity search with in-memory stubs, and the forecast service
//! with an unreachable endpoint so the documented defaults kick in.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

use vitalcoach::config::{Config, WeatherConfig};
use vitalcoach::errors::{PipelineError, Result};
use vitalcoach::pipeline::HealthPipeline;
use vitalcoach::rag::{ScoredDocument, SimilaritySearch};
use vitalcoach::streaming::{TextGenerator, TokenStream};
use vitalcoach::types::{
    ActivityLevel, MetricsRecord, SessionState, SleepQuality, VitalSign,
};
use vitalcoach::weather::{fallback_advisory, WeatherAdvisor, WeatherContext};

/// Generator with a fixed completion reply and a fixed chunk script
struct ScriptedGenerator {
    completion: String,
    chunks: Vec<String>,
}

impl ScriptedGenerator {
    fn new(completion: &str, chunks: &[&str]) -> Self {
        Self {
            completion: completion.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }
}

struct ScriptedStream {
    remaining: VecDeque<String>,
    /// Error to raise once the script is exhausted, instead of finishing
    trailing_error: Option<String>,
}

#[async_trait]
impl TokenStream for ScriptedStream {
    async fn next_delta(&mut self) -> Result<Option<String>> {
        match self.remaining.pop_front() {
            Some(delta) => Ok(Some(delta)),
            None => match self.trailing_error.take() {
                Some(message) => Err(PipelineError::Streaming(message)),
                None => Ok(None),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.completion.clone())
    }

    async fn stream(&self, _prompt: &str) -> Result<Box<dyn TokenStream>> {
        Ok(Box::new(ScriptedStream {
            remaining: self.chunks.iter().cloned().collect(),
            trailing_error: None,
        }))
    }
}

/// Generator whose every call fails
struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(PipelineError::OllamaApi("connection refused".to_string()))
    }

    async fn stream(&self, _prompt: &str) -> Result<Box<dyn TokenStream>> {
        Err(PipelineError::OllamaApi("connection refused".to_string()))
    }
}

/// Generator that yields some chunks and then dies mid-stream
struct InterruptedGenerator {
    chunks: Vec<String>,
}

#[async_trait]
impl TextGenerator for InterruptedGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("not json".to_string())
    }

    async fn stream(&self, _prompt: &str) -> Result<Box<dyn TokenStream>> {
        Ok(Box::new(ScriptedStream {
            remaining: self.chunks.iter().cloned().collect(),
            trailing_error: Some("connection reset".to_string()),
        }))
    }
}

/// In-memory similarity search stub
struct StubIndex {
    documents: Vec<&'static str>,
}

#[async_trait]
impl SimilaritySearch for StubIndex {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        Ok(self
            .documents
            .iter()
            .take(top_k)
            .map(|content| ScoredDocument {
                content: content.to_string(),
                score: 0.9,
            })
            .collect())
    }
}

struct FailingIndex;

#[async_trait]
impl SimilaritySearch for FailingIndex {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<ScoredDocument>> {
        Err(PipelineError::Index("service unavailable".to_string()))
    }
}

/// Config whose weather endpoint is unreachable, so the forecast defaults
/// (20°C, 50%, Unknown) apply quickly in tests
fn test_config() -> Config {
    let mut config = Config::default();
    config.weather = WeatherConfig {
        endpoint: "http://127.0.0.1:9/forecast".to_string(),
        timeout_secs: 1,
        ..WeatherConfig::default()
    };
    config
}

fn advisor(llm: &Arc<dyn TextGenerator>, config: &Config) -> Arc<WeatherAdvisor> {
    Arc::new(WeatherAdvisor::new(llm.clone(), config.weather.clone()).unwrap())
}

#[tokio::test]
async fn test_end_to_end_with_empty_index() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new(
        "not json",
        &["Eat ", "well and ", "rest."],
    ));

    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    let phase = pipeline.run(&mut session).await.unwrap();

    assert!(phase.is_terminal());
    assert_eq!(session.recommendations.len(), 1);
    assert_eq!(session.recommendations[0].content, "Eat well and rest.");

    let status = session.health_metrics.vitals_status.unwrap();
    assert_eq!(status.heart_rate, VitalSign::Normal);
    assert_eq!(status.sleep, SleepQuality::Optimal);
    assert_eq!(status.activity, ActivityLevel::Sedentary);

    // No index: retrieval skipped with an empty text, not an error
    assert_eq!(session.retrieved_knowledge.as_ref().unwrap().text, "");

    // Reactive weather fill-in on forecast defaults: 20°C, rule fallback
    let weather = session.weather_context.as_ref().unwrap();
    assert_eq!(weather.temperature, 20.0);
    assert_eq!(weather.condition, "Unknown");
    let advisory = weather.advisory.as_ref().unwrap();
    assert_eq!(advisory.exercise_recommendation.to_string(), "Outdoor");
    assert_eq!(advisory.intensity_level.to_string(), "Moderate");

    // Weather context mirrored for downstream consumers
    assert_eq!(
        session.health_metrics.weather_impact.as_ref().unwrap(),
        weather
    );
    assert!(session.health_metrics.last_processed.is_some());
}

#[tokio::test]
async fn test_streaming_partials_grow_in_order() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new(
        "not json",
        &["Eat ", "well and ", "rest."],
    ));

    let (observer, mut partials) = mpsc::unbounded_channel();
    let pipeline = HealthPipeline::standard(
        llm.clone(),
        advisor(&llm, &config),
        None,
        &config,
        Some(observer),
    );

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    pipeline.run(&mut session).await.unwrap();
    drop(pipeline);

    let mut observed = Vec::new();
    while let Some(partial) = partials.recv().await {
        observed.push(partial);
    }

    assert_eq!(
        observed,
        vec![
            "Eat ".to_string(),
            "Eat well and ".to_string(),
            "Eat well and rest.".to_string(),
        ]
    );
    assert_eq!(session.streaming_partial, "Eat well and rest.");
}

#[tokio::test]
async fn test_generation_failure_yields_placeholder() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(FailingGenerator);

    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    let phase = pipeline.run(&mut session).await.unwrap();

    // The pipeline still terminates and the caller still gets one entry
    assert!(phase.is_terminal());
    assert_eq!(session.recommendations.len(), 1);
    assert!(session.recommendations[0]
        .content
        .contains("Recommendation generation failed"));
    assert!(session
        .stage_notes
        .get("recommendation")
        .unwrap()
        .contains("failed"));

    // The advisory still derived via the rule despite the dead LLM
    assert!(session.weather_context.as_ref().unwrap().advisory.is_some());
}

#[tokio::test]
async fn test_interrupted_stream_keeps_partial_text() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(InterruptedGenerator {
        chunks: vec!["Eat ".to_string(), "well".to_string()],
    });

    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    let phase = pipeline.run(&mut session).await.unwrap();

    assert!(phase.is_terminal());
    assert_eq!(session.recommendations.len(), 1);
    assert_eq!(session.recommendations[0].content, "Eat well");
    assert!(session
        .stage_notes
        .get("recommendation")
        .unwrap()
        .contains("interrupted"));
}

#[tokio::test]
async fn test_retrieval_feeds_generation() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["ok"]));
    let index: Arc<dyn SimilaritySearch> = Arc::new(StubIndex {
        documents: vec![
            "Adults need 7-9 hours of sleep.",
            "10000 daily steps support cardiovascular health.",
        ],
    });

    let pipeline = HealthPipeline::standard(
        llm.clone(),
        advisor(&llm, &config),
        Some(index),
        &config,
        None,
    );

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    pipeline.run(&mut session).await.unwrap();

    let knowledge = session.retrieved_knowledge.as_ref().unwrap();
    assert_eq!(
        knowledge.text,
        "Adults need 7-9 hours of sleep.\n10000 daily steps support cardiovascular health."
    );
    assert!(session
        .stage_notes
        .get("knowledge")
        .unwrap()
        .contains("Retrieved 2"));

    // Prompt context is snapshotted alongside the text
    assert_eq!(knowledge.metrics_snapshot.steps, 8500);
}

#[tokio::test]
async fn test_zero_documents_retrieved() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["ok"]));
    let index: Arc<dyn SimilaritySearch> = Arc::new(StubIndex { documents: vec![] });

    let pipeline = HealthPipeline::standard(
        llm.clone(),
        advisor(&llm, &config),
        Some(index),
        &config,
        None,
    );

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    let phase = pipeline.run(&mut session).await.unwrap();

    assert!(phase.is_terminal());
    assert_eq!(session.retrieved_knowledge.as_ref().unwrap().text, "");
    assert!(session
        .stage_notes
        .get("knowledge")
        .unwrap()
        .contains("Retrieved 0"));
}

#[tokio::test]
async fn test_search_failure_treated_as_empty() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["ok"]));
    let index: Arc<dyn SimilaritySearch> = Arc::new(FailingIndex);

    let pipeline = HealthPipeline::standard(
        llm.clone(),
        advisor(&llm, &config),
        Some(index),
        &config,
        None,
    );

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    let phase = pipeline.run(&mut session).await.unwrap();

    assert!(phase.is_terminal());
    assert_eq!(session.retrieved_knowledge.as_ref().unwrap().text, "");
    assert_eq!(session.recommendations.len(), 1);
}

#[tokio::test]
async fn test_seeded_advisory_is_not_recomputed() {
    let config = test_config();
    // Any advise() call would produce a 20°C fallback advisory, not this one
    let seeded = WeatherContext {
        temperature: 33.0,
        humidity: 20.0,
        condition: "Clear sky".to_string(),
        advisory: Some(fallback_advisory(33.0, "Clear sky")),
    };

    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["ok"]));
    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    session.weather_context = Some(seeded.clone());

    pipeline.run(&mut session).await.unwrap();
    assert_eq!(session.weather_context.as_ref().unwrap(), &seeded);

    // A second evaluation within the same session leaves it untouched too
    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);
    pipeline.run(&mut session).await.unwrap();
    assert_eq!(session.weather_context.as_ref().unwrap(), &seeded);
}

#[tokio::test]
async fn test_seven_day_averages_take_precedence() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["ok"]));
    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut metrics = MetricsRecord::new(120.0, 4.0, 2000);
    metrics.heart_rate_avg_7d = Some(72.0);
    metrics.sleep_hours_avg_7d = Some(8.0);
    metrics.steps_avg_7d = Some(11_000);

    let mut session = SessionState::new(metrics);
    pipeline.run(&mut session).await.unwrap();

    // Averages mirrored into the canonical keys and classified
    assert_eq!(session.health_metrics.heart_rate, 72.0);
    let status = session.health_metrics.vitals_status.unwrap();
    assert_eq!(status.heart_rate, VitalSign::Normal);
    assert_eq!(status.sleep, SleepQuality::Optimal);
    assert_eq!(status.activity, ActivityLevel::Active);
}

#[tokio::test]
async fn test_llm_advisory_used_when_valid() {
    let config = test_config();
    let advisory_json = r#"{"exercise_recommendation": "Indoor", "intensity_level": "High", "weather_alert": true, "reasoning": "Air quality warning."}"#;
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new(advisory_json, &["ok"]));

    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    pipeline.run(&mut session).await.unwrap();

    let advisory = session
        .weather_context
        .as_ref()
        .unwrap()
        .advisory
        .as_ref()
        .unwrap();
    assert_eq!(advisory.exercise_recommendation.to_string(), "Indoor");
    assert_eq!(advisory.intensity_level.to_string(), "High");
    assert!(advisory.weather_alert);
    assert_eq!(advisory.reasoning, "Air quality warning.");
}

#[tokio::test]
async fn test_conversation_records_prompt_and_reply() {
    let config = test_config();
    let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new("not json", &["Rest up."]));
    let pipeline = HealthPipeline::standard(llm.clone(), advisor(&llm, &config), None, &config, None);

    let mut session = SessionState::new(MetricsRecord::new(75.0, 7.5, 8500));
    pipeline.run(&mut session).await.unwrap();

    assert_eq!(session.conversation.len(), 2);
    assert!(session.conversation[0].content.contains("Heart Rate: 75"));
    assert_eq!(session.conversation[1].content, "Rest up.");
}
