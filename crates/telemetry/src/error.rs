//! Telemetry error types

use contracts::ContractError;
use thiserror::Error;

/// Telemetry-specific errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Sink could not be created from its configuration
    #[error("failed to create sink '{name}': {source}")]
    SinkCreation {
        name: String,
        #[source]
        source: ContractError,
    },
}

impl TelemetryError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, source: ContractError) -> Self {
        Self::SinkCreation {
            name: name.into(),
            source,
        }
    }
}
