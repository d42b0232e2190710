//! Configuration validation
//!
//! Rules:
//! - ranging frequency within the range of the resolution
//! - poll interval > 0
//! - sensor height > 0
//! - udp/http sinks carry a parseable `addr`
//! - spidev bus names a device node and a valid SPI mode
//! - sink name not empty

use std::net::SocketAddr;

use contracts::{BusKind, ContractError, SessionBlueprint, SinkType};

/// Validate a SessionBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_sensor(blueprint)?;
    validate_bus(blueprint)?;
    validate_estimator(blueprint)?;
    validate_telemetry(blueprint)?;
    Ok(())
}

fn validate_sensor(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let sensor = &blueprint.sensor;
    let max = sensor.resolution.max_frequency_hz();

    if sensor.ranging_frequency_hz == 0 || sensor.ranging_frequency_hz > max {
        return Err(ContractError::config_validation(
            "sensor.ranging_frequency_hz",
            format!(
                "must be within 1..={max} Hz at {}, got {}",
                sensor.resolution, sensor.ranging_frequency_hz
            ),
        ));
    }

    if sensor.poll_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "sensor.poll_interval_ms",
            "poll_interval_ms must be > 0",
        ));
    }

    Ok(())
}

fn validate_bus(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let bus = &blueprint.bus;

    if bus.kind == BusKind::Spidev {
        match bus.device.as_deref() {
            None | Some("") => {
                return Err(ContractError::config_validation(
                    "bus.device",
                    "spidev bus requires a device node",
                ))
            }
            Some(_) => {}
        }
    }

    if bus.mode > 3 {
        return Err(ContractError::config_validation(
            "bus.mode",
            format!("SPI mode must be 0-3, got {}", bus.mode),
        ));
    }

    if bus.speed_hz == 0 {
        return Err(ContractError::config_validation(
            "bus.speed_hz",
            "speed_hz must be > 0",
        ));
    }

    Ok(())
}

fn validate_estimator(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let estimator = &blueprint.estimator;
    if estimator.enabled && estimator.sensor_height_mm <= 0 {
        return Err(ContractError::config_validation(
            "estimator.sensor_height_mm",
            format!(
                "sensor_height_mm must be > 0, got {}",
                estimator.sensor_height_mm
            ),
        ));
    }
    Ok(())
}

fn validate_telemetry(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let telemetry = &blueprint.telemetry;

    if telemetry.name.is_empty() {
        return Err(ContractError::config_validation(
            "telemetry.name",
            "sink name cannot be empty",
        ));
    }

    if matches!(telemetry.sink_type, SinkType::Udp | SinkType::Http) {
        let addr = telemetry.params.get("addr").ok_or_else(|| {
            ContractError::config_validation(
                "telemetry.params.addr",
                format!("{:?} sink requires an 'addr' parameter", telemetry.sink_type),
            )
        })?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(
                "telemetry.params.addr",
                format!("invalid address '{addr}': {e}"),
            )
        })?;
    }

    Ok(())
}
