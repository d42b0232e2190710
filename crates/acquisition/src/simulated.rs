//! Register-backed simulated sensor
//!
//! The driver half talks to the register file through a [`RegisterTransport`]
//! exactly as it would talk to hardware. The firmware half updates the same
//! registers behind its back: it publishes a new frame every few polls and
//! answers crosstalk calibration requests.

use std::collections::VecDeque;

use calibration::{
    SHAPE_BIN_COUNT, SIGNAL_GRID_SCALE, TAG_SHAPE_BINS, TAG_SIGNAL_GRID, XTALK_BUFFER_SIZE,
};
use contracts::{
    ContractError, Frame, PowerMode, RangingDevice, Resolution, SimulationConfig, TargetStatus,
    Zone,
};
use tracing::{debug, trace};
use transport::{swap_buffer, RegisterFileBus, RegisterTransport};

use crate::bringup::{probe_liveness, DEVICE_ID_REG, EXPECTED_DEVICE_ID, EXPECTED_REVISION};

// register map of the simulated firmware
const BOOT_STATUS_REG: u16 = 0x0006;
const POWER_MODE_REG: u16 = 0x0009;
const RESOLUTION_REG: u16 = 0x0010;
const FREQUENCY_REG: u16 = 0x0011;
const RANGING_CMD_REG: u16 = 0x0012;
const XTALK_CMD_REG: u16 = 0x0018;
const STATUS_BLOCK_REG: u16 = 0x0020;
const RESULTS_REG: u16 = 0x0100;
const XTALK_DATA_REG: u16 = 0x1000;

/// Bytes per zone record: distance, status, targets, signal
const ZONE_RECORD_LEN: usize = 8;

/// Distance added to rim zones, which see the vessel wall
const RIM_OFFSET_MM: i16 = 12;

/// Simulated multi-zone ranging sensor
pub struct SimulatedSensor {
    transport: RegisterTransport<RegisterFileBus>,
    firmware: Firmware,
    resolution: Resolution,
    initialized: bool,
    last_stream_count: Option<u8>,
}

impl SimulatedSensor {
    /// Sensor with the default scene
    pub fn new() -> Self {
        Self::from_config(&SimulationConfig::default())
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let registers = RegisterFileBus::new();
        let firmware = Firmware::boot(registers.clone(), config);
        Self {
            transport: RegisterTransport::new(registers),
            firmware,
            resolution: Resolution::R4x4,
            initialized: false,
            last_stream_count: None,
        }
    }

    /// Queue a frame for the firmware to publish instead of the scene
    pub fn push_frame(&mut self, frame: Frame) {
        self.firmware.script.push_back(frame);
    }

    /// Move the liquid surface
    pub fn set_surface_distance(&mut self, distance_mm: i16) {
        self.firmware.surface_distance_mm = distance_mm;
    }

    /// Make the next init fail
    pub fn fail_boot(&mut self) {
        self.firmware.registers.poke(BOOT_STATUS_REG, &[0x00]);
    }

    /// Register file shared with the firmware, for fault injection
    pub fn bus(&self) -> &RegisterFileBus {
        self.transport.bus()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_ranging(&self) -> bool {
        self.firmware.is_ranging()
    }

    pub fn is_asleep(&self) -> bool {
        self.firmware.is_asleep()
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl RangingDevice for SimulatedSensor {
    fn is_alive(&mut self) -> Result<bool, ContractError> {
        let identity = probe_liveness(&mut self.transport)?;
        debug!(
            device_id = identity.device_id,
            revision = identity.revision,
            "simulated sensor identity"
        );
        Ok(identity.is_expected())
    }

    fn init(&mut self) -> Result<(), ContractError> {
        let boot = self.transport.read_byte(BOOT_STATUS_REG)?;
        if boot & 0x01 == 0 {
            return Err(ContractError::initialization(
                "firmware did not report boot completion",
            ));
        }
        self.transport.write_byte(RANGING_CMD_REG, 0)?;
        self.set_resolution(Resolution::R4x4)?;
        self.set_ranging_frequency_hz(1)?;
        self.initialized = true;
        Ok(())
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), ContractError> {
        self.transport
            .write_byte(RESOLUTION_REG, resolution.zone_count() as u8)?;
        self.resolution = resolution;
        Ok(())
    }

    fn set_ranging_frequency_hz(&mut self, frequency_hz: u8) -> Result<(), ContractError> {
        let max = self.resolution.max_frequency_hz();
        if !(1..=max).contains(&frequency_hz) {
            return Err(ContractError::config_validation(
                "sensor.ranging_frequency_hz",
                format!("{frequency_hz} Hz outside 1..={max} for {}", self.resolution),
            ));
        }
        self.transport.write_byte(FREQUENCY_REG, frequency_hz)?;
        Ok(())
    }

    fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), ContractError> {
        if self.transport.read_byte(RANGING_CMD_REG)? != 0 {
            return Err(ContractError::Other(format!(
                "power mode {mode} requested while ranging"
            )));
        }
        let value = match mode {
            PowerMode::Sleep => 0x00,
            PowerMode::Wakeup => 0x01,
        };
        self.transport.write_byte(POWER_MODE_REG, value)?;
        debug!(%mode, "power mode set");
        Ok(())
    }

    fn get_power_mode(&mut self) -> Result<PowerMode, ContractError> {
        match self.transport.read_byte(POWER_MODE_REG)? {
            0x00 => Ok(PowerMode::Sleep),
            0x01 => Ok(PowerMode::Wakeup),
            other => Err(ContractError::Other(format!(
                "unknown power mode register value {other:#04x}"
            ))),
        }
    }

    fn start_ranging(&mut self) -> Result<(), ContractError> {
        if !self.initialized {
            return Err(ContractError::initialization("start requested before init"));
        }
        if self.get_power_mode()? == PowerMode::Sleep {
            return Err(ContractError::initialization("start requested while asleep"));
        }
        // whatever is published now is stale
        let status = self.transport.read_multi(STATUS_BLOCK_REG, 4)?;
        self.last_stream_count = Some(status[0]);
        self.transport.write_byte(RANGING_CMD_REG, 1)?;
        Ok(())
    }

    fn stop_ranging(&mut self) -> Result<(), ContractError> {
        self.transport.write_byte(RANGING_CMD_REG, 0)?;
        Ok(())
    }

    fn check_data_ready(&mut self) -> Result<bool, ContractError> {
        self.firmware.tick();

        let status = self.transport.read_multi(STATUS_BLOCK_REG, 4)?;
        let ready = Some(status[0]) != self.last_stream_count
            && status[1] == 0x05
            && status[2] & 0x05 == 0x05
            && status[3] & 0x10 == 0x10;
        if ready {
            self.last_stream_count = Some(status[0]);
        }
        trace!(stream_count = status[0], ready, "data ready check");
        Ok(ready)
    }

    fn get_ranging_data(&mut self) -> Result<Frame, ContractError> {
        let zone_count = self.resolution.zone_count();
        let mut raw = self
            .transport
            .read_multi(RESULTS_REG, zone_count * ZONE_RECORD_LEN)?;
        swap_buffer(&mut raw);

        let zones = raw
            .chunks_exact(ZONE_RECORD_LEN)
            .map(|record| {
                let head = u32::from_ne_bytes([record[0], record[1], record[2], record[3]]);
                let signal = u32::from_ne_bytes([record[4], record[5], record[6], record[7]]);
                Zone {
                    distance_mm: (head >> 16) as u16 as i16,
                    target_status: TargetStatus((head >> 8) as u8),
                    nb_target_detected: head as u8,
                    signal_per_spad: signal,
                }
            })
            .collect();

        Frame::new(
            self.resolution,
            self.last_stream_count.unwrap_or_default(),
            zones,
        )
    }

    fn calibrate_xtalk(
        &mut self,
        reflectance_percent: u16,
        nb_samples: u8,
        distance_mm: u16,
    ) -> Result<(), ContractError> {
        if !(1..=99).contains(&reflectance_percent)
            || !(1..=16).contains(&nb_samples)
            || !(600..=3000).contains(&distance_mm)
        {
            return Err(ContractError::calibration(format!(
                "invalid crosstalk parameters: {reflectance_percent} %, {nb_samples} samples, {distance_mm} mm"
            )));
        }

        let mut command = Vec::with_capacity(5);
        command.extend_from_slice(&reflectance_percent.to_be_bytes());
        command.push(nb_samples);
        command.extend_from_slice(&distance_mm.to_be_bytes());
        self.transport.write_multi(XTALK_CMD_REG, &command)?;

        self.firmware.service_xtalk();
        Ok(())
    }

    fn get_caldata_xtalk(&mut self) -> Result<Vec<u8>, ContractError> {
        Ok(self
            .transport
            .read_multi(XTALK_DATA_REG, XTALK_BUFFER_SIZE)?)
    }
}

/// Firmware side of the simulation
struct Firmware {
    registers: RegisterFileBus,
    surface_distance_mm: i16,
    ready_after_polls: u32,
    polls: u32,
    stream_count: u8,
    script: VecDeque<Frame>,
}

impl Firmware {
    fn boot(registers: RegisterFileBus, config: &SimulationConfig) -> Self {
        registers.poke(DEVICE_ID_REG, &[EXPECTED_DEVICE_ID, EXPECTED_REVISION]);
        registers.poke(BOOT_STATUS_REG, &[0x01]);
        registers.poke(POWER_MODE_REG, &[0x01]);
        Self {
            registers,
            surface_distance_mm: config.surface_distance_mm,
            ready_after_polls: config.ready_after_polls,
            polls: 0,
            stream_count: 0,
            script: VecDeque::new(),
        }
    }

    fn is_ranging(&self) -> bool {
        self.registers.peek(RANGING_CMD_REG, 1) == [1]
    }

    fn is_asleep(&self) -> bool {
        self.registers.peek(POWER_MODE_REG, 1) == [0x00]
    }

    fn resolution(&self) -> Resolution {
        if self.registers.peek(RESOLUTION_REG, 1) == [16] {
            Resolution::R4x4
        } else {
            Resolution::R8x8
        }
    }

    /// One host poll went by
    fn tick(&mut self) {
        if !self.is_ranging() || self.is_asleep() {
            return;
        }
        self.polls += 1;
        if self.polls > self.ready_after_polls {
            self.polls = 0;
            self.publish();
        }
    }

    fn publish(&mut self) {
        let frame = match self.script.pop_front() {
            Some(frame) => frame,
            None => self.scene(self.resolution()),
        };

        let mut results = Vec::with_capacity(frame.zones.len() * ZONE_RECORD_LEN);
        for zone in &frame.zones {
            let head = (u32::from(zone.distance_mm as u16) << 16)
                | (u32::from(zone.target_status.code()) << 8)
                | u32::from(zone.nb_target_detected);
            results.extend_from_slice(&head.to_be_bytes());
            results.extend_from_slice(&zone.signal_per_spad.to_be_bytes());
        }
        self.registers.poke(RESULTS_REG, &results);

        self.stream_count = self.stream_count.wrapping_add(1);
        self.registers
            .poke(STATUS_BLOCK_REG, &[self.stream_count, 0x05, 0x05, 0x10]);
        trace!(stream_count = self.stream_count, "frame published");
    }

    /// Flat surface: centre zones strong, rim zones weak, corners empty
    fn scene(&self, resolution: Resolution) -> Frame {
        let centre = estimator::center_zones(resolution);
        let width = resolution.width();
        let edge = width - 1;

        let zones = (0..resolution.zone_count())
            .map(|index| {
                let (row, col) = (index / width, index % width);
                if (row == 0 || row == edge) && (col == 0 || col == edge) {
                    return Zone::empty();
                }
                match centre.iter().position(|zone| *zone == index) {
                    Some(rank) => Zone::target(
                        self.surface_distance_mm,
                        1500 - rank as u32 * 50,
                        TargetStatus::RANGE_VALID,
                    ),
                    None => Zone::target(
                        self.surface_distance_mm.saturating_add(RIM_OFFSET_MM),
                        300,
                        TargetStatus::RANGE_VALID,
                    ),
                }
            })
            .collect();

        Frame {
            resolution,
            stream_count: 0,
            zones,
        }
    }

    fn service_xtalk(&mut self) {
        let command = self.registers.peek(XTALK_CMD_REG, 5);
        let reflectance = u32::from(u16::from_be_bytes([command[0], command[1]]));
        let distance = u32::from(u16::from_be_bytes([command[3], command[4]]));
        let resolution = self.resolution();

        let mut words = vec![0u32; XTALK_BUFFER_SIZE / 4];
        words[0] = 0x0000_0001;

        let shape_at = 2;
        words[shape_at] = (u32::from(TAG_SHAPE_BINS) << 16) | SHAPE_BIN_COUNT as u32;
        for pair in 0..SHAPE_BIN_COUNT / 2 {
            let low = shape_bin(pair * 2);
            let high = shape_bin(pair * 2 + 1);
            words[shape_at + 1 + pair] = low | (high << 16);
        }

        let grid_at = shape_at + 1 + SHAPE_BIN_COUNT / 2 + 1;
        let zone_count = resolution.zone_count();
        words[grid_at] = (u32::from(TAG_SIGNAL_GRID) << 16) | zone_count as u32;
        let base = reflectance + 6000 / distance.max(1);
        for zone in 0..zone_count {
            let kcps = base + (zone % resolution.width()) as u32;
            words[grid_at + 1 + zone] = kcps * SIGNAL_GRID_SCALE;
        }

        let blob: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        self.registers.poke(XTALK_DATA_REG, &blob);
        debug!(reflectance, distance, zone_count, "crosstalk calibration done");
    }
}

/// Crosstalk histogram shape peaking at the middle bin
fn shape_bin(index: usize) -> u32 {
    let peak = SHAPE_BIN_COUNT / 2;
    4000u32.saturating_sub(index.abs_diff(peak) as u32 * 50)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calibration::{CalibrationBuffer, DecodedCalibration};

    fn ranging_sensor(resolution: Resolution) -> SimulatedSensor {
        let mut sensor = SimulatedSensor::new();
        assert!(sensor.is_alive().unwrap());
        sensor.init().unwrap();
        sensor.set_resolution(resolution).unwrap();
        sensor.start_ranging().unwrap();
        sensor
    }

    #[test]
    fn test_ready_after_configured_polls() {
        let mut sensor = ranging_sensor(Resolution::R8x8);

        let answers: Vec<bool> = (0..4).map(|_| sensor.check_data_ready().unwrap()).collect();
        assert_eq!(answers, vec![false, false, false, true]);
        // same stream count is not ready twice
        assert!(!sensor.check_data_ready().unwrap());
    }

    #[test]
    fn test_not_ready_before_start() {
        let mut sensor = SimulatedSensor::new();
        sensor.init().unwrap();
        for _ in 0..10 {
            assert!(!sensor.check_data_ready().unwrap());
        }
    }

    #[test]
    fn test_scene_frame_read_back_over_bus() {
        let mut sensor = ranging_sensor(Resolution::R8x8);
        while !sensor.check_data_ready().unwrap() {}

        let frame = sensor.get_ranging_data().unwrap();
        assert_eq!(frame.zones.len(), 64);
        assert_eq!(frame.stream_count, 1);
        assert_eq!(frame.zones[27].distance_mm, 50);
        assert_eq!(frame.zones[27].signal_per_spad, 1500);
        assert_eq!(frame.zones[0].target_status, TargetStatus::NO_TARGET);
        assert_eq!(frame.zones[1].distance_mm, 62);
    }

    #[test]
    fn test_scripted_frame_round_trips() {
        let mut sensor = ranging_sensor(Resolution::R4x4);
        let mut scripted = Frame::empty(Resolution::R4x4);
        scripted.zones[5] = Zone::target(-3, 0x0012_3456, TargetStatus::RANGE_VALID_LARGE_PULSE);
        sensor.push_frame(scripted.clone());

        while !sensor.check_data_ready().unwrap() {}
        let frame = sensor.get_ranging_data().unwrap();
        assert_eq!(frame.zones, scripted.zones);
    }

    #[test]
    fn test_bus_fault_surfaces_as_transport_error() {
        let mut sensor = ranging_sensor(Resolution::R4x4);
        sensor.bus().fail_next(1);

        let err = sensor.check_data_ready().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_frequency_checked_against_resolution() {
        let mut sensor = ranging_sensor(Resolution::R8x8);
        assert!(sensor.set_ranging_frequency_hz(15).is_ok());
        assert!(sensor.set_ranging_frequency_hz(30).is_err());
        assert!(sensor.set_ranging_frequency_hz(0).is_err());
    }

    #[test]
    fn test_xtalk_blob_decodes() {
        let mut sensor = ranging_sensor(Resolution::R8x8);
        sensor.calibrate_xtalk(3, 4, 600).unwrap();

        let blob = sensor.get_caldata_xtalk().unwrap();
        assert_eq!(blob.len(), XTALK_BUFFER_SIZE);

        let buffer = CalibrationBuffer::new(blob).unwrap();
        let decoded = DecodedCalibration::from_blocks(buffer.decode(Resolution::R8x8));
        assert_eq!(decoded.shape_bins().map(|bins| bins[72]), Some(4000));
        let grid = decoded.signal_grid().unwrap();
        assert_eq!(grid.len(), 64);
        assert_eq!(grid[0], 13);
        assert_eq!(grid[7], 20);
    }

    #[test]
    fn test_power_mode_round_trip() {
        let mut sensor = SimulatedSensor::new();
        sensor.init().unwrap();
        assert_eq!(sensor.get_power_mode().unwrap(), PowerMode::Wakeup);

        sensor.set_power_mode(PowerMode::Sleep).unwrap();
        assert_eq!(sensor.get_power_mode().unwrap(), PowerMode::Sleep);
        assert!(sensor.is_asleep());
        assert!(sensor.start_ranging().is_err());

        sensor.set_power_mode(PowerMode::Wakeup).unwrap();
        sensor.start_ranging().unwrap();
        assert!(sensor.is_ranging());
    }

    #[test]
    fn test_power_mode_locked_while_ranging() {
        let mut sensor = ranging_sensor(Resolution::R4x4);
        assert!(sensor.set_power_mode(PowerMode::Sleep).is_err());
        assert!(!sensor.is_asleep());

        sensor.stop_ranging().unwrap();
        sensor.set_power_mode(PowerMode::Sleep).unwrap();
        assert!(sensor.is_asleep());
    }

    #[test]
    fn test_xtalk_rejects_bad_parameters() {
        let mut sensor = ranging_sensor(Resolution::R8x8);
        assert!(sensor.calibrate_xtalk(0, 4, 600).is_err());
        assert!(sensor.calibrate_xtalk(3, 0, 600).is_err());
        assert!(sensor.calibrate_xtalk(3, 4, 100).is_err());
    }
}
