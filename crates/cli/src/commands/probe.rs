//! `probe` command implementation.

use acquisition::{probe_liveness, DeviceIdentity, SimulatedSensor};
use anyhow::{Context, Result};
use contracts::{BusKind, SessionBlueprint};
use tracing::{info, warn};
use transport::{Bus, RegisterTransport};

use super::load_blueprint;
use crate::cli::ProbeArgs;

/// Execute the `probe` command
pub fn run_probe(args: &ProbeArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let identity = probe(&blueprint)?;

    println!(
        "device id {:#04x}, revision {:#04x}: {}",
        identity.device_id,
        identity.revision,
        if identity.is_expected() {
            "sensor alive"
        } else {
            "unexpected device"
        }
    );

    if identity.is_expected() {
        Ok(())
    } else {
        anyhow::bail!("Sensor did not identify itself")
    }
}

fn probe(blueprint: &SessionBlueprint) -> Result<DeviceIdentity> {
    match blueprint.bus.kind {
        BusKind::Simulated => {
            let sensor = SimulatedSensor::from_config(&blueprint.simulation);
            probe_bus(sensor.bus().clone())
        }
        BusKind::Spidev => probe_spidev(blueprint),
    }
}

#[cfg(feature = "spidev")]
fn probe_spidev(blueprint: &SessionBlueprint) -> Result<DeviceIdentity> {
    let device = blueprint
        .bus
        .device
        .as_deref()
        .context("spidev bus requires a device node")?;
    let bus = transport::SpidevBus::open(device, blueprint.bus.speed_hz, blueprint.bus.mode)
        .with_context(|| format!("Failed to open {device}"))?;
    probe_bus(bus)
}

#[cfg(not(feature = "spidev"))]
fn probe_spidev(_blueprint: &SessionBlueprint) -> Result<DeviceIdentity> {
    anyhow::bail!("built without spidev support; rebuild with `--features spidev`")
}

fn probe_bus<B: Bus>(bus: B) -> Result<DeviceIdentity> {
    let mut transport = RegisterTransport::new(bus);
    let identity = probe_liveness(&mut transport).context("Sensor not responding")?;

    if identity.is_expected() {
        info!(device_id = identity.device_id, revision = identity.revision, "Sensor alive");
    } else {
        warn!(device_id = identity.device_id, revision = identity.revision, "Unexpected device");
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquisition::{DEVICE_ID_REG, EXPECTED_DEVICE_ID};
    use transport::RegisterFileBus;

    #[test]
    fn test_probe_simulated_bus() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            "[telemetry]\nsink_type = \"log\"\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(probe(&blueprint).unwrap().is_expected());
    }

    #[test]
    fn test_probe_unexpected_device() {
        let bus = RegisterFileBus::new();
        bus.poke(DEVICE_ID_REG, &[EXPECTED_DEVICE_ID, 0x01]);
        let identity = probe_bus(bus).unwrap();
        assert!(!identity.is_expected());
    }

    #[test]
    fn test_probe_bus_fault() {
        let bus = RegisterFileBus::new();
        bus.fail_next(1);
        assert!(probe_bus(bus).is_err());
    }
}
