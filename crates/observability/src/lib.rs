//! # Observability
//!
//! Logging and metrics plumbing for the relay.
//!
//! Logs go through `tracing`; the subscriber honours `RUST_LOG` and falls back
//! to the configured level. Metrics go through the `metrics` facade. The
//! recorders in [`metrics`] are no-ops until an exporter is installed, so the
//! acquisition and telemetry crates call them unconditionally and the binary
//! decides whether a Prometheus endpoint is served.
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     ..Default::default()
//! })?;
//! observability::init_metrics_only(9000)?;
//! ```

pub mod metrics;

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub use crate::metrics::{
    record_frame_acquired, record_liquid_height, record_telemetry_sent, record_transport_error,
    LevelStatsAggregator, LevelSummary, RunningStats, StatsSummary,
};

/// Subscriber output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with source location
    #[default]
    Json,
    /// Multi-line, for a terminal
    Pretty,
    /// One line per event
    Compact,
}

/// Logging and metrics settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Level used when `RUST_LOG` is unset
    pub default_log_level: String,
    /// Prometheus scrape port, `None` keeps metrics in-process
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            metrics_port: None,
        }
    }
}

/// Ready checks per frame; the simulator answers after a handful
const POLL_BUCKETS: &[f64] = &[1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0];

/// Liquid height (mm), sized for vessels up to half a metre
const HEIGHT_BUCKETS_MM: &[f64] = &[
    0.0, 25.0, 50.0, 75.0, 100.0, 150.0, 200.0, 250.0, 300.0, 400.0, 500.0,
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn format_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

fn env_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("invalid log level '{default_level}'")),
    }
}

/// Install the tracing subscriber and, if a port is set, the Prometheus exporter
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = env_filter(&config.default_log_level)?;
    tracing_subscriber::registry()
        .with(format_layer(config.log_format).with_filter(filter))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Address the Prometheus endpoint binds to
pub fn metrics_listen_addr(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

fn prometheus_builder(addr: SocketAddr) -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(crate::metrics::POLLS_PER_FRAME.to_string()),
            POLL_BUCKETS,
        )
        .and_then(|builder| {
            builder.set_buckets_for_metric(
                Matcher::Full(crate::metrics::LIQUID_HEIGHT_HIST.to_string()),
                HEIGHT_BUCKETS_MM,
            )
        })
        .context("invalid histogram buckets")
}

/// Install only the Prometheus exporter, for when tracing is set up elsewhere
pub fn init_metrics_only(port: u16) -> Result<()> {
    let addr = metrics_listen_addr(port);
    prometheus_builder(addr)?
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on {addr}"))?;

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_keeps_metrics_in_process() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_log_level, "info");
    }

    #[test]
    fn test_metrics_listen_on_all_interfaces() {
        let addr = metrics_listen_addr(9100);
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn test_histogram_buckets_accepted() {
        assert!(prometheus_builder(metrics_listen_addr(0)).is_ok());
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            let _layer = format_layer(format);
        }
    }
}
