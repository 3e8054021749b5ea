//! Knowledge retrieval stage.
//!
//! Queries the medical-document index with the current vitals. An
//! uninitialized index and a failing search both degrade to an empty
//! result set; retrieval never blocks the pipeline.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::Result;
use crate::rag::SimilaritySearch;
use crate::stages::Stage;
use crate::types::{RetrievedKnowledge, SessionState};

pub const STAGE_NAME: &str = "knowledge";

/// Build the retrieval query from the canonical metrics
pub fn retrieval_query(state: &SessionState) -> String {
    format!(
        "Health insights for: Heart rate: {}, Sleep: {} hours, Steps: {}",
        state.health_metrics.heart_rate,
        state.health_metrics.sleep_hours,
        state.health_metrics.steps
    )
}

/// Knowledge retrieval stage
pub struct KnowledgeRetriever {
    index: Option<Arc<dyn SimilaritySearch>>,
    top_k: usize,
}

impl KnowledgeRetriever {
    pub fn new(index: Option<Arc<dyn SimilaritySearch>>, top_k: usize) -> Self {
        Self { index, top_k }
    }
}

#[async_trait]
impl Stage for KnowledgeRetriever {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    async fn process(&self, state: &mut SessionState) -> Result<()> {
        let (text, note) = match &self.index {
            None => (
                String::new(),
                "Skipped document retrieval (index not initialized)".to_string(),
            ),
            Some(index) => {
                let query = retrieval_query(state);
                match index.search(&query, self.top_k).await {
                    Ok(documents) => {
                        let text = documents
                            .iter()
                            .map(|doc| doc.content.as_str())
                            .collect::<Vec<_>>()
                            .join("\n");
                        let note = format!("Retrieved {} medical documents", documents.len());
                        (text, note)
                    }
                    Err(e) => {
                        eprintln!("[KNOWLEDGE] Error during similarity search: {}", e);
                        (String::new(), "Retrieved 0 medical documents".to_string())
                    }
                }
            }
        };

        state.retrieved_knowledge = Some(RetrievedKnowledge {
            text,
            metrics_snapshot: state.health_metrics.clone(),
        });
        state.note(STAGE_NAME, note);

        Ok(())
    }
}
