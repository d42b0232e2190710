//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `SessionBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("Resolution: {}", blueprint.sensor.resolution);
//! ```

mod parser;
mod validator;

pub use contracts::SessionBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SessionBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        Self::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate a blueprint built or modified in code (e.g. after CLI overrides)
    pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize SessionBlueprint to TOML string
    pub fn to_toml(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SessionBlueprint to JSON string
    pub fn to_json(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BusKind, CommandLayout, Resolution, SinkType};
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
[sensor]
resolution = "4x4"
ranging_frequency_hz = 30
poll_interval_ms = 5
max_frames = 2000
transport_retries = 0

[bus]
kind = "spidev"
device = "/dev/spidev0.0"
speed_hz = 3000000
mode = 3

[estimator]
enabled = true
sensor_height_mm = 216

[simulation]
surface_distance_mm = 50
ready_after_polls = 3

[telemetry]
name = "pico"
sink_type = "udp"
command = "liquid_level"
idle_value = 4000
params = { addr = "192.168.4.1:12345" }
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.sensor.resolution, Resolution::R4x4);
        assert_eq!(bp.sensor.max_frames(), Some(2000));
        assert_eq!(bp.bus.kind, BusKind::Spidev);
        assert_eq!(bp.bus.device.as_deref(), Some("/dev/spidev0.0"));
        assert_eq!(bp.telemetry.sink_type, SinkType::Udp);
        assert_eq!(bp.telemetry.command, CommandLayout::LiquidLevel);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.sensor.resolution, bp2.sensor.resolution);
        assert_eq!(bp.telemetry.params, bp2.telemetry.params);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(SAMPLE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.estimator.sensor_height_mm, bp2.estimator.sensor_height_mm);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        // 8x8 tops out at 15 Hz
        let content = SAMPLE_TOML.replace("resolution = \"4x4\"", "resolution = \"8x8\"");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("ranging_frequency_hz"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.telemetry.name, "pico");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_shipped_configs_are_valid() {
        let bench = include_str!("../../../configs/relay.toml");
        let bp = ConfigLoader::load_from_str(bench, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.bus.kind, BusKind::Simulated);

        let board = include_str!("../../../configs/relay-http.json");
        let bp = ConfigLoader::load_from_str(board, ConfigFormat::Json).unwrap();
        assert_eq!(bp.telemetry.sink_type, SinkType::Http);
        assert_eq!(bp.sensor.max_frames(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/relay.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
