//! LogSink - logs commands via tracing

use contracts::{ContractError, TelemetryCommand, TelemetrySink};
use tracing::{info, instrument};

/// Sink that logs every command, for dry runs
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TelemetrySink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_send", skip(self, command), fields(sink = %self.name))]
    async fn send(&mut self, command: &TelemetryCommand) -> Result<(), ContractError> {
        info!(sink = %self.name, values = ?command.values(), "telemetry command");
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
