//! TelemetrySender - sink selected by configuration

use std::sync::Arc;

use contracts::{ContractError, SinkType, TelemetryCommand, TelemetryConfig, TelemetrySink};
use tracing::{info, instrument, warn};

use crate::error::TelemetryError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{HttpSink, LogSink, UdpSink};

/// Configured sink
pub enum SinkKind {
    Udp(UdpSink),
    Http(HttpSink),
    Log(LogSink),
}

/// Sink chosen by [`create_sender`], with send counters
pub struct TelemetrySender {
    name: String,
    sink: SinkKind,
    metrics: Arc<SinkMetrics>,
}

impl TelemetrySender {
    pub fn new(name: impl Into<String>, sink: SinkKind) -> Self {
        Self {
            name: name.into(),
            sink,
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn sink(&self) -> &SinkKind {
        &self.sink
    }

    /// Shared counters, readable while the session owns the sender
    pub fn metrics(&self) -> Arc<SinkMetrics> {
        self.metrics.clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl TelemetrySink for TelemetrySender {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, command: &TelemetryCommand) -> Result<(), ContractError> {
        let result = match &mut self.sink {
            SinkKind::Udp(sink) => sink.send_command(command).await,
            SinkKind::Http(sink) => sink.send_command(command).await,
            SinkKind::Log(sink) => sink.send(command).await.map(|()| 0),
        };
        match result {
            Ok(bytes) => {
                self.metrics.record_sent(bytes);
                Ok(())
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err)
            }
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        let snapshot = self.metrics.snapshot();
        info!(
            sink = %self.name,
            sent = snapshot.send_count,
            failed = snapshot.failure_count,
            bytes = snapshot.bytes_sent,
            "closing sink"
        );
        match &mut self.sink {
            SinkKind::Udp(sink) => sink.close().await,
            SinkKind::Http(sink) => sink.close().await,
            SinkKind::Log(sink) => sink.close().await,
        }
    }
}

/// Create the sender described by the telemetry configuration
#[instrument(
    name = "telemetry_create_sender",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sender(config: &TelemetryConfig) -> Result<TelemetrySender, TelemetryError> {
    let sink = match config.sink_type {
        SinkType::Udp => SinkKind::Udp(
            UdpSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| TelemetryError::sink_creation(&config.name, e))?,
        ),
        SinkType::Http => SinkKind::Http(
            HttpSink::from_params(&config.name, &config.params)
                .map_err(|e| TelemetryError::sink_creation(&config.name, e))?,
        ),
        SinkType::Log => {
            if !config.params.is_empty() {
                warn!(sink = %config.name, "log sink ignores params");
            }
            SinkKind::Log(LogSink::new(&config.name))
        }
    };
    Ok(TelemetrySender::new(&config.name, sink))
}
