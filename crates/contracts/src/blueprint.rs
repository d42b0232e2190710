//! SessionBlueprint - Config Loader output
//!
//! Describes a complete relay session: sensor, bus, estimator, simulation and telemetry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Resolution, SHUTDOWN_VALUE};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Ranging settings
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Register bus settings
    #[serde(default)]
    pub bus: BusConfig,

    /// Liquid-level estimation settings
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Simulated device scene (simulated bus only)
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Output routing
    pub telemetry: TelemetryConfig,
}

/// Ranging and scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Grid resolution
    #[serde(default)]
    pub resolution: Resolution,

    /// Ranging frequency (Hz)
    #[serde(default = "default_ranging_frequency_hz")]
    pub ranging_frequency_hz: u8,

    /// Host-side delay between ready checks (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Frames to acquire before stopping (0 = unbounded)
    #[serde(default)]
    pub max_frames: u64,

    /// Extra attempts for a failed ready check before the loop gives up
    #[serde(default)]
    pub transport_retries: u32,

    /// Put the sensor to sleep after ranging stops
    #[serde(default)]
    pub sleep_on_exit: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            ranging_frequency_hz: default_ranging_frequency_hz(),
            poll_interval_ms: default_poll_interval_ms(),
            max_frames: 0,
            transport_retries: 0,
            sleep_on_exit: false,
        }
    }
}

impl SensorConfig {
    /// Frame bound, `None` when unbounded
    pub fn max_frames(&self) -> Option<u64> {
        (self.max_frames > 0).then_some(self.max_frames)
    }

    /// Delay between ready checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_ranging_frequency_hz() -> u8 {
    10
}

fn default_poll_interval_ms() -> u64 {
    5
}

/// Register bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus backend
    #[serde(default)]
    pub kind: BusKind,

    /// Device node (spidev only), e.g. "/dev/spidev0.0"
    #[serde(default)]
    pub device: Option<String>,

    /// Clock speed (Hz)
    #[serde(default = "default_speed_hz")]
    pub speed_hz: u32,

    /// SPI mode (0-3)
    #[serde(default = "default_spi_mode")]
    pub mode: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::default(),
            device: None,
            speed_hz: default_speed_hz(),
            mode: default_spi_mode(),
        }
    }
}

fn default_speed_hz() -> u32 {
    3_000_000
}

fn default_spi_mode() -> u8 {
    3
}

/// Bus backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusKind {
    /// In-memory register file driven by the device simulator
    #[default]
    Simulated,
    /// Linux spidev character device
    Spidev,
}

/// Liquid-level estimation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Run the estimator on every frame
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Distance from the sensor to the vessel floor (mm)
    #[serde(default = "default_sensor_height_mm")]
    pub sensor_height_mm: i32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensor_height_mm: default_sensor_height_mm(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sensor_height_mm() -> i32 {
    216
}

/// Scene rendered by the device simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Distance from the sensor to the liquid surface (mm)
    #[serde(default = "default_surface_distance_mm")]
    pub surface_distance_mm: i16,

    /// Ready checks answered "not ready" before each frame
    #[serde(default = "default_ready_after_polls")]
    pub ready_after_polls: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            surface_distance_mm: default_surface_distance_mm(),
            ready_after_polls: default_ready_after_polls(),
        }
    }
}

fn default_surface_distance_mm() -> i16 {
    50
}

fn default_ready_after_polls() -> u32 {
    3
}

/// Telemetry output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Sink name
    #[serde(default = "default_sink_name")]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// What the 16 command values carry
    #[serde(default)]
    pub command: CommandLayout,

    /// Value sent on every channel when there is nothing to report
    #[serde(default = "default_idle_value")]
    pub idle_value: i16,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sink_name() -> String {
    "telemetry".to_string()
}

fn default_idle_value() -> i16 {
    SHUTDOWN_VALUE
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Binary datagram, fire-and-forget
    Udp,
    /// Text body over HTTP/1.0, one connection per command
    Http,
    /// Log output
    Log,
}

/// Command payload selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandLayout {
    /// Per-zone distances (8x8 pooled to 4x4)
    #[default]
    Distances,
    /// Estimated liquid height on every channel
    LiquidLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let json = r#"{ "telemetry": { "sink_type": "log" } }"#;
        let blueprint: SessionBlueprint = serde_json::from_str(json).unwrap();

        assert_eq!(blueprint.sensor.resolution, Resolution::R8x8);
        assert_eq!(blueprint.sensor.max_frames(), None);
        assert_eq!(blueprint.sensor.poll_interval(), Duration::from_millis(5));
        assert!(!blueprint.sensor.sleep_on_exit);
        assert_eq!(blueprint.bus.kind, BusKind::Simulated);
        assert_eq!(blueprint.bus.mode, 3);
        assert!(blueprint.estimator.enabled);
        assert_eq!(blueprint.estimator.sensor_height_mm, 216);
        assert_eq!(blueprint.telemetry.name, "telemetry");
        assert_eq!(blueprint.telemetry.command, CommandLayout::Distances);
        assert_eq!(blueprint.telemetry.idle_value, 4000);
    }

    #[test]
    fn max_frames_zero_is_unbounded() {
        let mut sensor = SensorConfig::default();
        assert_eq!(sensor.max_frames(), None);
        sensor.max_frames = 2000;
        assert_eq!(sensor.max_frames(), Some(2000));
    }

    #[test]
    fn sink_and_layout_names() {
        let json = r#"{ "sink_type": "udp", "command": "liquid_level" }"#;
        let telemetry: TelemetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(telemetry.sink_type, SinkType::Udp);
        assert_eq!(telemetry.command, CommandLayout::LiquidLevel);
    }
}
