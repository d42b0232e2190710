//! # ToF Relay CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Sensor bring-up and the relay session
//! - Bus probing and crosstalk decoding
//! - Graceful shutdown on Ctrl+C / SIGTERM

mod cli;
mod commands;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_probe, run_validate, run_xtalk};

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "tof-relay starting");

    // the session is a single cooperative task
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Run(args) => run_pipeline(args).await,
            Commands::Validate(args) => run_validate(args),
            Commands::Info(args) => run_info(args),
            Commands::Probe(args) => run_probe(args),
            Commands::Xtalk(args) => run_xtalk(args),
        }
    });

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
