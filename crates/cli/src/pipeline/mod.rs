//! Relay orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{open_device, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
