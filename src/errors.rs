//! Error types for the vitalcoach pipeline.
//!
//! External-service failures (weather, LLM, vector store) are recovered
//! inside the stage that saw them; these variants exist for the service
//! clients and the binary edges, not for crossing stage boundaries.

use thiserror::Error;

/// Main error type for the recommendation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Weather service errors
    #[error("Weather service error: {0}")]
    WeatherApi(String),

    /// Ollama API errors
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    /// Streaming errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// JSON parsing errors
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Knowledge index errors
    #[error("Knowledge index error: {0}")]
    Index(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Generic errors with context
    #[error("Pipeline error: {0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors to PipelineError
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Generic(err.to_string())
    }
}
