//! RangingDevice trait - sensor firmware abstraction
//!
//! The ranging firmware is opaque to this workspace. This trait is the seam the
//! acquisition scheduler drives, so real drivers and the simulator share one API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ContractError, Frame, Resolution};

/// Sensor power mode
///
/// A sleeping sensor keeps its configuration but does not range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    Sleep,
    #[default]
    Wakeup,
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sleep => f.write_str("sleep"),
            Self::Wakeup => f.write_str("wakeup"),
        }
    }
}

/// Multi-zone ranging sensor
///
/// Every call is a blocking bus transaction. Implementations never retry on
/// their own; retry policy belongs to the caller.
///
/// # Example
///
/// ```ignore
/// let mut device: Box<dyn RangingDevice> = open_device();
/// if device.is_alive()? {
///     device.init()?;
///     device.start_ranging()?;
/// }
/// ```
pub trait RangingDevice: Send {
    /// Check that the expected device answers on the bus
    fn is_alive(&mut self) -> Result<bool, ContractError>;

    /// Bring the device to the ready state
    fn init(&mut self) -> Result<(), ContractError>;

    /// Select the grid resolution
    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), ContractError>;

    /// Select the ranging frequency
    fn set_ranging_frequency_hz(&mut self, frequency_hz: u8) -> Result<(), ContractError>;

    /// Switch power mode; only allowed while not ranging
    fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), ContractError>;

    /// Read back the current power mode
    fn get_power_mode(&mut self) -> Result<PowerMode, ContractError>;

    /// Start continuous ranging
    fn start_ranging(&mut self) -> Result<(), ContractError>;

    /// Stop ranging
    fn stop_ranging(&mut self) -> Result<(), ContractError>;

    /// Whether a new frame is waiting
    fn check_data_ready(&mut self) -> Result<bool, ContractError>;

    /// Fetch the waiting frame
    fn get_ranging_data(&mut self) -> Result<Frame, ContractError>;

    /// Run crosstalk calibration against a target of known reflectance
    fn calibrate_xtalk(
        &mut self,
        reflectance_percent: u16,
        nb_samples: u8,
        distance_mm: u16,
    ) -> Result<(), ContractError>;

    /// Read back the crosstalk calibration blob (big-endian block layout)
    fn get_caldata_xtalk(&mut self) -> Result<Vec<u8>, ContractError>;
}
