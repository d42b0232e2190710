//! Relay orchestrator - brings the sensor up and drives one session.

use std::time::Duration;

use acquisition::{SensorBringUp, Session, SimulatedSensor, StopHandle, Termination};
use anyhow::{Context, Result};
use contracts::{BusKind, SessionBlueprint};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PipelineStats;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated session configuration, CLI overrides applied
    pub blueprint: SessionBlueprint,

    /// Stop after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run one session to completion.
    ///
    /// Bring-up failures are fatal. A failure inside the loop still produces
    /// stats; it is returned as the error after the summary is logged.
    pub async fn run(self) -> Result<PipelineStats> {
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut device = open_device(blueprint)?;
        SensorBringUp::from_config(&blueprint.sensor)
            .bring_up(&mut device)
            .context("Sensor bring-up failed")?;

        let sender = telemetry::create_sender(&blueprint.telemetry)
            .await
            .context("Failed to create telemetry sender")?;
        info!(sink = %blueprint.telemetry.name, sink_type = ?blueprint.telemetry.sink_type, "Telemetry sender ready");

        let mut session = Session::from_blueprint(device, sender, blueprint)
            .context("Failed to build relay session")?;

        let stop = session.stop_handle();
        let watchers = [
            Some(tokio::spawn(stop_on_signal(stop.clone()))),
            self.config
                .timeout
                .map(|timeout| tokio::spawn(stop_after(timeout, stop))),
        ];

        info!(max_frames = ?blueprint.sensor.max_frames(), "Relay running");
        let (session_stats, outcome) = session.run().await;

        for watcher in watchers.into_iter().flatten() {
            watcher.abort();
        }

        let stats = PipelineStats {
            sink: session.sink().snapshot(),
            session: session_stats,
        };

        if stats.session.termination == Termination::Failed {
            stats.print_summary();
        }
        outcome.context("Relay loop terminated")?;
        Ok(stats)
    }
}

/// Open the ranging device named by the bus configuration
pub fn open_device(blueprint: &SessionBlueprint) -> Result<SimulatedSensor> {
    match blueprint.bus.kind {
        BusKind::Simulated => {
            info!(
                surface_distance_mm = blueprint.simulation.surface_distance_mm,
                ready_after_polls = blueprint.simulation.ready_after_polls,
                "Running against the simulated sensor"
            );
            Ok(SimulatedSensor::from_config(&blueprint.simulation))
        }
        BusKind::Spidev => anyhow::bail!(
            "no ranging driver is linked for the spidev bus; use `probe` to check the wiring \
             or run with bus.kind = \"simulated\""
        ),
    }
}

/// Raise the stop flag on Ctrl+C or SIGTERM
async fn stop_on_signal(stop: StopHandle) {
    shutdown_signal().await;
    warn!("Received shutdown signal, stopping after the current cycle");
    stop.stop();
}

async fn stop_after(timeout: Duration, stop: StopHandle) {
    tokio::time::sleep(timeout).await;
    warn!(timeout_secs = timeout.as_secs(), "Timeout reached, stopping");
    stop.stop();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
