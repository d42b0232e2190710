//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::Resolution;
use std::net::SocketAddr;
use std::path::PathBuf;

/// ToF relay - liquid-level estimation and actuator telemetry from a multi-zone ToF sensor
#[derive(Parser, Debug)]
#[command(
    name = "tof-relay",
    author,
    version,
    about = "Multi-zone ToF liquid-level relay",
    long_about = "Brings a multi-zone time-of-flight sensor up, polls it for frames,\n\
                  estimates the liquid level in the vessel below it and relays a\n\
                  16-value command per frame to the actuator over UDP or HTTP."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TOF_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TOF_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Check that the sensor answers on the bus
    Probe(ProbeArgs),

    /// Decode crosstalk calibration data
    Xtalk(XtalkArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "TOF_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the frame bound from configuration (0 = unbounded)
    #[arg(long, env = "TOF_RELAY_MAX_FRAMES")]
    pub max_frames: Option<u64>,

    /// Stop after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TOF_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Override the telemetry target address
    #[arg(long, env = "TOF_RELAY_ADDR")]
    pub addr: Option<SocketAddr>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TOF_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Log commands instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `probe` command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "TOF_RELAY_CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the `xtalk` command
#[derive(Parser, Debug)]
pub struct XtalkArgs {
    /// Configuration file; selects the bus and the resolution
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Decode a raw blob from this file instead of calibrating
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Resolution used to size the signal grid when no config is given
    #[arg(long, default_value = "8x8", value_parser = parse_resolution)]
    pub resolution: Resolution,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

fn parse_resolution(value: &str) -> Result<Resolution, String> {
    match value {
        "4x4" => Ok(Resolution::R4x4),
        "8x8" => Ok(Resolution::R8x8),
        other => Err(format!("unknown resolution '{other}', expected 4x4 or 8x8")),
    }
}
