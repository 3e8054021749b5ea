//! Pipeline phase tracking.
//!
//! Four phases, advanced unconditionally in sequence; there is no
//! branching, retry loop, or early termination path.

use serde::{Deserialize, Serialize};

/// Pipeline execution phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Session state populated, nothing processed yet
    Init,

    /// Vitals classified and weather context ensured
    VitalsEvaluated,

    /// Medical knowledge retrieved (possibly empty)
    KnowledgeRetrieved,

    /// Recommendation appended; terminal
    RecommendationGenerated,
}

impl PipelinePhase {
    /// Advance to the next phase; the terminal phase is absorbing
    pub fn advance(&self) -> PipelinePhase {
        match self {
            PipelinePhase::Init => PipelinePhase::VitalsEvaluated,
            PipelinePhase::VitalsEvaluated => PipelinePhase::KnowledgeRetrieved,
            PipelinePhase::KnowledgeRetrieved => PipelinePhase::RecommendationGenerated,
            PipelinePhase::RecommendationGenerated => PipelinePhase::RecommendationGenerated,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::RecommendationGenerated)
    }

    /// Human-readable phase name
    pub fn display_name(&self) -> &'static str {
        match self {
            PipelinePhase::Init => "Initialized",
            PipelinePhase::VitalsEvaluated => "Vitals Evaluated",
            PipelinePhase::KnowledgeRetrieved => "Knowledge Retrieved",
            PipelinePhase::RecommendationGenerated => "Recommendation Generated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_advance_in_order() {
        let mut phase = PipelinePhase::Init;

        phase = phase.advance();
        assert_eq!(phase, PipelinePhase::VitalsEvaluated);

        phase = phase.advance();
        assert_eq!(phase, PipelinePhase::KnowledgeRetrieved);

        phase = phase.advance();
        assert_eq!(phase, PipelinePhase::RecommendationGenerated);
    }

    #[test]
    fn test_terminal_phase_absorbs() {
        let terminal = PipelinePhase::RecommendationGenerated;
        assert!(terminal.is_terminal());
        assert_eq!(terminal.advance(), terminal);
    }

    #[test]
    fn test_only_last_phase_is_terminal() {
        assert!(!PipelinePhase::Init.is_terminal());
        assert!(!PipelinePhase::VitalsEvaluated.is_terminal());
        assert!(!PipelinePhase::KnowledgeRetrieved.is_terminal());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(PipelinePhase::Init.display_name(), "Initialized");
        assert_eq!(
            PipelinePhase::RecommendationGenerated.display_name(),
            "Recommendation Generated"
        );
    }
}
