//! Sensor bring-up and register-level liveness probe

use contracts::{ContractError, PowerMode, RangingDevice, Resolution, SensorConfig};
use tracing::{info, instrument, warn};
use transport::{Bus, RegisterTransport};

use crate::error::Result;

/// Page select register
pub const PAGE_SELECT_REG: u16 = 0x7fff;
/// Device id register (page 0)
pub const DEVICE_ID_REG: u16 = 0x0000;
/// Revision register (page 0)
pub const REVISION_REG: u16 = 0x0001;
/// Expected device id
pub const EXPECTED_DEVICE_ID: u8 = 0xf0;
/// Expected revision
pub const EXPECTED_REVISION: u8 = 0x0c;

/// Identity read by [`probe_liveness`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: u8,
    pub revision: u8,
}

impl DeviceIdentity {
    /// Whether this is the expected sensor
    pub fn is_expected(&self) -> bool {
        self.device_id == EXPECTED_DEVICE_ID && self.revision == EXPECTED_REVISION
    }
}

/// Read the device identity straight off the bus.
///
/// Selects page 0, reads id and revision, then returns to page 2.
pub fn probe_liveness<B: Bus>(
    transport: &mut RegisterTransport<B>,
) -> std::result::Result<DeviceIdentity, transport::TransportError> {
    transport.write_byte(PAGE_SELECT_REG, 0x00)?;
    let device_id = transport.read_byte(DEVICE_ID_REG)?;
    let revision = transport.read_byte(REVISION_REG)?;
    transport.write_byte(PAGE_SELECT_REG, 0x02)?;
    Ok(DeviceIdentity {
        device_id,
        revision,
    })
}

/// Sensor bring-up sequence
#[derive(Debug, Clone)]
pub struct SensorBringUp {
    resolution: Resolution,
    ranging_frequency_hz: u8,
}

impl SensorBringUp {
    pub fn new(resolution: Resolution, ranging_frequency_hz: u8) -> Self {
        Self {
            resolution,
            ranging_frequency_hz,
        }
    }

    pub fn from_config(sensor: &SensorConfig) -> Self {
        Self::new(sensor.resolution, sensor.ranging_frequency_hz)
    }

    /// Check liveness, initialize, wake, configure and start ranging.
    ///
    /// A device that does not answer, or a bus failure during the alive
    /// check, is a liveness error. A failed init is an initialization error.
    /// A sensor left asleep by an earlier run is woken before configuration.
    #[instrument(
        name = "sensor_bring_up",
        skip(self, device),
        fields(resolution = %self.resolution, frequency_hz = self.ranging_frequency_hz)
    )]
    pub fn bring_up<D: RangingDevice>(&self, device: &mut D) -> Result<()> {
        match device.is_alive() {
            Ok(true) => {}
            Ok(false) => return Err(ContractError::liveness("device id mismatch").into()),
            Err(err) => {
                return Err(ContractError::liveness(format!("alive check failed: {err}")).into())
            }
        }

        device.init().map_err(|err| match err {
            ContractError::Initialization { .. } => err,
            other => ContractError::initialization(other.to_string()),
        })?;
        device.set_power_mode(PowerMode::Wakeup)?;
        device.set_resolution(self.resolution)?;
        device.set_ranging_frequency_hz(self.ranging_frequency_hz)?;
        device.start_ranging()?;

        info!("sensor ranging");
        Ok(())
    }

    /// Stop ranging, logging instead of failing
    pub fn shutdown<D: RangingDevice>(device: &mut D) {
        match device.stop_ranging() {
            Ok(()) => info!("sensor stopped"),
            Err(err) => warn!(error = %err, "failed to stop ranging"),
        }
    }

    /// Stop ranging and put the sensor to sleep, logging instead of failing
    pub fn power_down<D: RangingDevice>(device: &mut D) {
        Self::shutdown(device);
        match device.set_power_mode(PowerMode::Sleep) {
            Ok(()) => info!("sensor asleep"),
            Err(err) => warn!(error = %err, "failed to put sensor to sleep"),
        }
    }
}
