//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{SessionBlueprint, SinkType};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        resolution = %blueprint.sensor.resolution,
        frequency_hz = blueprint.sensor.ranging_frequency_hz,
        bus = ?blueprint.bus.kind,
        sink = %blueprint.telemetry.name,
        sink_type = ?blueprint.telemetry.sink_type,
        "Configuration loaded"
    );

    if args.dry_run {
        print_config_summary(&blueprint);
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting relay...");
    let stats = pipeline.run().await.context("Relay execution failed")?;

    info!(
        frames = stats.session.frames,
        sent = stats.sink.send_count,
        failed = stats.sink.failure_count,
        fps = format!("{:.2}", stats.fps()),
        termination = ?stats.session.termination,
        "Relay finished"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(blueprint: &mut SessionBlueprint, args: &RunArgs) {
    if let Some(max_frames) = args.max_frames {
        info!(max_frames, "Overriding frame bound from CLI");
        blueprint.sensor.max_frames = max_frames;
    }
    if let Some(addr) = args.addr {
        info!(addr = %addr, "Overriding telemetry address from CLI");
        blueprint
            .telemetry
            .params
            .insert("addr".to_string(), addr.to_string());
    }
    if args.dry_run {
        info!("Dry run - commands are logged, not sent");
        blueprint.telemetry.sink_type = SinkType::Log;
        blueprint.telemetry.params = HashMap::new();
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &SessionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sensor:");
    println!("  Resolution: {}", blueprint.sensor.resolution);
    println!("  Frequency: {} Hz", blueprint.sensor.ranging_frequency_hz);
    println!("  Poll interval: {} ms", blueprint.sensor.poll_interval_ms);
    match blueprint.sensor.max_frames() {
        Some(max) => println!("  Max frames: {max}"),
        None => println!("  Max frames: unbounded"),
    }
    println!("\nBus: {:?}", blueprint.bus.kind);
    if blueprint.estimator.enabled {
        println!(
            "Estimator: sensor height {} mm",
            blueprint.estimator.sensor_height_mm
        );
    } else {
        println!("Estimator: disabled");
    }
    println!(
        "Telemetry: {} ({:?}, {:?})",
        blueprint.telemetry.name, blueprint.telemetry.sink_type, blueprint.telemetry.command
    );
    println!();
}
