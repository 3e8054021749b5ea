//! Pipeline orchestrator.
//!
//! Owns the ordered stage sequence and threads one session state through
//! it. Stages are trait objects; the orchestrator performs no
//! reconciliation between them and trusts each to leave the state
//! internally consistent.

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::errors::Result;
use crate::pipeline::PipelinePhase;
use crate::rag::SimilaritySearch;
use crate::stages::{KnowledgeRetriever, RecommendationGenerator, Stage, VitalsEvaluator};
use crate::streaming::TextGenerator;
use crate::types::SessionState;
use crate::weather::WeatherAdvisor;

/// Fixed-order stage pipeline
pub struct HealthPipeline {
    stages: Vec<Box<dyn Stage>>,
    verbose: bool,
}

impl HealthPipeline {
    /// Build a pipeline from an explicit stage sequence
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            verbose: false,
        }
    }

    /// Log phase transitions to stderr
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the standard three-stage pipeline from injected services.
    ///
    /// `index` may be `None` (uninitialized knowledge index);
    /// `observer` receives every streaming running total when present.
    pub fn standard(
        llm: Arc<dyn TextGenerator>,
        advisor: Arc<WeatherAdvisor>,
        index: Option<Arc<dyn SimilaritySearch>>,
        config: &Config,
        observer: Option<UnboundedSender<String>>,
    ) -> Self {
        let vitals = VitalsEvaluator::new(
            advisor,
            config.thresholds,
            (
                config.weather.default_latitude,
                config.weather.default_longitude,
            ),
        );
        let knowledge = KnowledgeRetriever::new(index, config.rag.top_k);
        let recommend = match observer {
            Some(observer) => RecommendationGenerator::with_observer(llm, observer),
            None => RecommendationGenerator::new(llm),
        };

        Self::new(vec![
            Box::new(vitals),
            Box::new(knowledge),
            Box::new(recommend),
        ])
    }

    /// Run every stage in order against `state`, returning the final
    /// phase. Every stage always runs; there is no short-circuiting.
    pub async fn run(&self, state: &mut SessionState) -> Result<PipelinePhase> {
        let mut phase = PipelinePhase::Init;

        for stage in &self.stages {
            if self.verbose {
                eprintln!("[PIPELINE] {} -> running {}", phase.display_name(), stage.name());
            }

            stage.process(state).await?;
            phase = phase.advance();

            if self.verbose {
                eprintln!("[PIPELINE] reached {}", phase.display_name());
            }
        }

        Ok(phase)
    }

    /// Number of configured stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
