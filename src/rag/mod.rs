//! Knowledge retrieval: document loading/chunking and the similarity
//! search service boundary.
//!
//! The vector store is an external collaborator. Stages depend only on
//! the `SimilaritySearch` trait; an absent handle models an uninitialized
//! index and is a valid, non-error state.

pub mod chunker;
pub mod index;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A retrieved document chunk with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub content: String,
    pub score: f32,
}

/// Opaque similarity-search service handle
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return up to `top_k` chunks ordered by similarity to `query`
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>>;
}

pub use chunker::{chunk_text, load_documents, Document};
pub use index::QdrantIndex;
