//! Qdrant-backed knowledge index.
//!
//! One collection, cosine distance; chunk text travels in the payload.
//! An existing collection counts as persisted state and is loaded as-is;
//! an absent one triggers a fresh build from the documents folder.

use anyhow::Context;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config as VectorConfig, with_payload_selector::SelectorOptions,
        CreateCollection, Distance, PointStruct, SearchPoints, Value as QdrantValue,
        VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::errors::{PipelineError, Result};
use crate::rag::chunker::{chunk_text, load_documents};
use crate::rag::{ScoredDocument, SimilaritySearch};
use crate::streaming::OllamaClient;

/// Knowledge index over an external Qdrant collection
pub struct QdrantIndex {
    client: QdrantClient,
    embedder: Arc<OllamaClient>,
    config: RagConfig,
}

impl QdrantIndex {
    /// Connect to the Qdrant service
    pub fn connect(embedder: Arc<OllamaClient>, config: RagConfig) -> Result<Self> {
        let client = QdrantClient::from_url(&config.qdrant_url)
            .build()
            .context("Failed to create Qdrant client")?;

        Ok(Self {
            client,
            embedder,
            config,
        })
    }

    /// Check whether the collection already exists on the service
    pub async fn has_persisted_state(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.config.collection))
    }

    /// Build the index from a documents folder (or a single file).
    ///
    /// Chunks every document, embeds each chunk, and upserts the batch.
    /// Returns the number of chunks indexed.
    pub async fn build_from_path(&self, path: &Path) -> Result<usize> {
        let documents = load_documents(path)?;
        if documents.is_empty() {
            return Ok(0);
        }

        self.ensure_collection().await?;

        let chunks: Vec<(String, String)> = documents
            .iter()
            .flat_map(|doc| {
                let source = doc.source.display().to_string();
                chunk_text(&doc.text, self.config.chunk_size, self.config.chunk_overlap)
                    .into_iter()
                    .map(move |chunk| (source.clone(), chunk))
            })
            .collect();

        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner} Indexing chunks [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut points = Vec::with_capacity(chunks.len());
        for (source, chunk) in &chunks {
            let embedding = self.embedder.embed(chunk).await?;

            let mut payload: HashMap<String, QdrantValue> = HashMap::new();
            payload.insert("text".to_string(), QdrantValue::from(chunk.clone()));
            payload.insert("source".to_string(), QdrantValue::from(source.clone()));

            points.push(PointStruct::new(
                Uuid::new_v4().to_string(),
                embedding,
                payload,
            ));
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.client
            .upsert_points_blocking(&self.config.collection, None, points, None)
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;

        Ok(chunks.len())
    }

    async fn ensure_collection(&self) -> Result<()> {
        if self.has_persisted_state().await? {
            return Ok(());
        }

        self.client
            .create_collection(&CreateCollection {
                collection_name: self.config.collection.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(VectorConfig::Params(VectorParams {
                        size: self.config.embedding_dim,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SimilaritySearch for QdrantIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        let embedding = self.embedder.embed(query).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.config.collection.clone(),
                vector: embedding,
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| PipelineError::Index(e.to_string()))?;

        let documents = search_result
            .result
            .into_iter()
            .map(|point| {
                let content = point
                    .payload
                    .get("text")
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();

                ScoredDocument {
                    content,
                    score: point.score,
                }
            })
            .collect();

        Ok(documents)
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}
