//! Ollama API client.
//!
//! Covers the three endpoints the pipeline needs: text completion
//! (streaming and non-streaming) via POST /api/generate, embeddings via
//! POST /api/embeddings, and the /api/version health check.

use crate::config::LlmConfig;
use crate::errors::{PipelineError, Result};
use crate::streaming::parser::JsonExtractor;
use crate::streaming::{TextGenerator, TokenStream};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama HTTP client with a bounded request timeout
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    temperature: f64,
}

impl OllamaClient {
    /// Create a client from the LLM configuration section
    pub fn with_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(PipelineError::Http)?;

        Ok(Self {
            client,
            base_url: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        })
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed a single text via the embeddings endpoint
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::OllamaApi(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::OllamaApi(format!(
                "Embedding request returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::OllamaApi(format!("Failed to parse embedding: {}", e)))?;

        Ok(body.embedding)
    }

    /// Get the configured generation model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_generate(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::OllamaApi(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::OllamaApi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.send_generate(prompt, false).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::OllamaApi(format!("Failed to parse response: {}", e)))?;

        Ok(body.response)
    }

    async fn stream(&self, prompt: &str) -> Result<Box<dyn TokenStream>> {
        let response = self.send_generate(prompt, true).await?;

        let bytes = response
            .bytes_stream()
            .map(|result| {
                result
                    .map(|b| b.to_vec())
                    .map_err(|e| PipelineError::Streaming(e.to_string()))
            })
            .boxed();

        Ok(Box::new(OllamaTokenStream {
            inner: bytes,
            parser: JsonExtractor::new(),
            done: false,
        }))
    }
}

/// Lazy, finite, non-restartable sequence of generated text increments
struct OllamaTokenStream {
    inner: BoxStream<'static, Result<Vec<u8>>>,
    parser: JsonExtractor,
    done: bool,
}

#[async_trait]
impl TokenStream for OllamaTokenStream {
    async fn next_delta(&mut self) -> Result<Option<String>> {
        loop {
            // Drain already-buffered chunks before touching the wire
            while let Some(json) = self.parser.next_object()? {
                let chunk: GenerateChunk = serde_json::from_str(&json)
                    .map_err(|e| PipelineError::JsonParse(format!("Bad stream chunk: {}", e)))?;

                if chunk.done {
                    self.done = true;
                }
                if !chunk.response.is_empty() {
                    return Ok(Some(chunk.response));
                }
                if self.done {
                    return Ok(None);
                }
            }

            if self.done {
                return Ok(None);
            }

            match self.inner.next().await {
                Some(Ok(bytes)) => self.parser.push_bytes(&bytes)?,
                Some(Err(e)) => return Err(e),
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f64,
}

/// One NDJSON record of a streaming reply
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Non-streaming reply body
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
