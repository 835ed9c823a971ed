// src/pipeline/mod.rs

pub mod event_bus;
pub mod metrics;
pub mod orchestrator;

pub use event_bus::{EventBus, MatchEvent};
pub use metrics::PipelineMetrics;
pub use orchestrator::{MatchOutput, MatchPipeline};
