//! Core data types: chat messages, telemetry records, session state.

pub mod messages;
pub mod metrics;
pub mod state;

pub use messages::{ChatMessage, Role};
pub use metrics::{
    ActivityLevel, MetricsRecord, SleepQuality, VitalSign, VitalsStatus,
};
pub use state::{RetrievedKnowledge, SessionState};
