//! Pipeline stages.
//!
//! Every stage implements the same capability interface; the orchestrator
//! holds an ordered sequence of stage handles and knows nothing about the
//! concrete types behind them.

pub mod knowledge;
pub mod recommend;
pub mod vitals;

use crate::errors::Result;
use crate::types::SessionState;
use async_trait::async_trait;

/// Uniform processing contract across heterogeneous stages.
///
/// Stages mutate the session state in place. External-service failures
/// are recovered inside the stage; an `Err` from `process` means a bug,
/// not a transient condition.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage key used in `stage_notes` and transition logs
    fn name(&self) -> &'static str;

    async fn process(&self, state: &mut SessionState) -> Result<()>;
}

pub use knowledge::KnowledgeRetriever;
pub use recommend::RecommendationGenerator;
pub use vitals::VitalsEvaluator;
