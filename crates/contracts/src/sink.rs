//! TelemetrySink trait - output interface of the relay
//!
//! Defines the abstract interface for telemetry sinks.

use crate::{ContractError, TelemetryCommand};

/// Telemetry output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(TelemetrySink: Send)]
pub trait LocalTelemetrySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Transmit one command
    ///
    /// # Errors
    /// Returns a network error; the caller decides whether it is fatal
    async fn send(&mut self, command: &TelemetryCommand) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
