//! vitalcoach - Personalized health recommendations from local Ollama
//! models.
//!
//! A fixed-order pipeline turns raw health telemetry, live weather
//! conditions, and a medical-document knowledge base into a streamed,
//! personalized recommendation:
//!
//! - **Vitals evaluation**: classifies heart rate, sleep, and activity
//! - **Knowledge retrieval**: similarity search over indexed documents
//! - **Recommendation generation**: streamed LLM completion
//!
//! A weather advisory seeds the pipeline and is filled in reactively when
//! absent. Every external service degrades to a documented default; a run
//! always produces exactly one recommendation entry.

pub mod config;
pub mod errors;
pub mod pipeline;
pub mod rag;
pub mod stages;
pub mod streaming;
pub mod types;
pub mod weather;

// Re-export commonly used types
pub use config::Config;
pub use errors::{PipelineError, Result};
pub use pipeline::{HealthPipeline, PipelinePhase};
pub use types::{MetricsRecord, SessionState};
