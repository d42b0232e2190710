//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::SessionBlueprint;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sensor: SensorInfo,
    bus: BusInfo,
    estimator: EstimatorInfo,
    telemetry: TelemetryInfo,
}

#[derive(Serialize)]
struct SensorInfo {
    resolution: String,
    zones: usize,
    ranging_frequency_hz: u8,
    poll_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_frames: Option<u64>,
    transport_retries: u32,
    sleep_on_exit: bool,
}

#[derive(Serialize)]
struct BusInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<String>,
    speed_hz: u32,
    mode: u8,
}

#[derive(Serialize)]
struct EstimatorInfo {
    enabled: bool,
    sensor_height_mm: i32,
}

#[derive(Serialize)]
struct TelemetryInfo {
    name: String,
    sink_type: String,
    command: String,
    idle_value: i16,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &SessionBlueprint) -> ConfigInfo {
    let sensor = &blueprint.sensor;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sensor: SensorInfo {
            resolution: sensor.resolution.to_string(),
            zones: sensor.resolution.zone_count(),
            ranging_frequency_hz: sensor.ranging_frequency_hz,
            poll_interval_ms: sensor.poll_interval_ms,
            max_frames: sensor.max_frames(),
            transport_retries: sensor.transport_retries,
            sleep_on_exit: sensor.sleep_on_exit,
        },
        bus: BusInfo {
            kind: format!("{:?}", blueprint.bus.kind),
            device: blueprint.bus.device.clone(),
            speed_hz: blueprint.bus.speed_hz,
            mode: blueprint.bus.mode,
        },
        estimator: EstimatorInfo {
            enabled: blueprint.estimator.enabled,
            sensor_height_mm: blueprint.estimator.sensor_height_mm,
        },
        telemetry: TelemetryInfo {
            name: blueprint.telemetry.name.clone(),
            sink_type: format!("{:?}", blueprint.telemetry.sink_type),
            command: format!("{:?}", blueprint.telemetry.command),
            idle_value: blueprint.telemetry.idle_value,
            params: blueprint.telemetry.params.clone(),
        },
    }
}

fn print_config_info(blueprint: &SessionBlueprint) {
    let sensor = &blueprint.sensor;
    println!("=== ToF Relay Configuration ===\n");

    println!("Sensor");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Resolution: {} ({} zones)",
        sensor.resolution,
        sensor.resolution.zone_count()
    );
    println!("   ├─ Frequency: {} Hz", sensor.ranging_frequency_hz);
    println!("   ├─ Poll interval: {} ms", sensor.poll_interval_ms);
    println!("   ├─ Transport retries: {}", sensor.transport_retries);
    println!("   ├─ Sleep on exit: {}", sensor.sleep_on_exit);
    match sensor.max_frames() {
        Some(max) => println!("   └─ Max frames: {}", max),
        None => println!("   └─ Max frames: unbounded"),
    }

    let bus = &blueprint.bus;
    println!("\nBus");
    println!("   ├─ Kind: {:?}", bus.kind);
    if let Some(ref device) = bus.device {
        println!("   ├─ Device: {}", device);
    }
    println!("   └─ Speed: {} Hz, mode {}", bus.speed_hz, bus.mode);

    println!("\nEstimator");
    if blueprint.estimator.enabled {
        println!(
            "   └─ Sensor height: {} mm",
            blueprint.estimator.sensor_height_mm
        );
    } else {
        println!("   └─ Disabled");
    }

    let telemetry = &blueprint.telemetry;
    println!("\nTelemetry");
    println!("   ├─ Sink: {} ({:?})", telemetry.name, telemetry.sink_type);
    println!("   ├─ Command: {:?}", telemetry.command);
    println!("   ├─ Idle value: {}", telemetry.idle_value);
    let mut params: Vec<_> = telemetry.params.iter().collect();
    params.sort();
    if params.is_empty() {
        println!("   └─ Params: (none)");
    } else {
        for (i, (key, value)) in params.iter().enumerate() {
            let prefix = if i == params.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} = {}", prefix, key, value);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_info_json_shape() {
        let bp = ConfigLoader::load_from_str(
            "[sensor]\nresolution = \"4x4\"\nranging_frequency_hz = 30\n\n[telemetry]\nsink_type = \"log\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        let json = serde_json::to_value(build_config_info(&bp)).unwrap();

        assert_eq!(json["sensor"]["resolution"], "4x4");
        assert_eq!(json["sensor"]["zones"], 16);
        assert!(json["sensor"].get("max_frames").is_none());
        assert!(json["telemetry"].get("params").is_none());
        assert_eq!(json["estimator"]["sensor_height_mm"], 216);
    }
}
