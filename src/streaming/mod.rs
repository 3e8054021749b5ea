//! LLM service boundary: Ollama client, stream chunk parsing, and the
//! injectable text-generation traits the stages depend on.

pub mod client;
pub mod parser;

use crate::errors::Result;
use async_trait::async_trait;

/// A lazy, finite, non-restartable sequence of generated text increments.
///
/// `next_delta` yields the next increment, or `None` once the generation
/// is finished. Errors after the first increment leave already-yielded
/// text valid.
#[async_trait]
pub trait TokenStream: Send {
    async fn next_delta(&mut self) -> Result<Option<String>>;
}

/// Text-completion service handle.
///
/// Constructed by the orchestrator's caller and injected into each
/// component that needs it; there are no process-wide service globals.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt and return the full reply
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Complete a prompt incrementally
    async fn stream(&self, prompt: &str) -> Result<Box<dyn TokenStream>>;
}

pub use client::OllamaClient;
pub use parser::{first_json_object, JsonExtractor, MAX_BUFFER_SIZE};
