//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BusKind, SessionBlueprint, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    resolution: String,
    ranging_frequency_hz: u8,
    bus: String,
    sink_type: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    resolution: blueprint.sensor.resolution.to_string(),
                    ranging_frequency_hz: blueprint.sensor.ranging_frequency_hz,
                    bus: format!("{:?}", blueprint.bus.kind),
                    sink_type: format!("{:?}", blueprint.telemetry.sink_type),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.telemetry.sink_type == SinkType::Log {
        warnings.push("Log sink configured - commands will not reach the actuator".to_string());
    }

    if blueprint.bus.kind == BusKind::Spidev {
        warnings.push("spidev bus supports `probe` only; `run` needs the simulated bus".to_string());
    }

    if blueprint.telemetry.command == contracts::CommandLayout::LiquidLevel
        && !blueprint.estimator.enabled
    {
        warnings.push(
            "liquid_level command with the estimator disabled - every command will be idle"
                .to_string(),
        );
    }

    if blueprint.sensor.max_frames().is_none() && blueprint.sensor.transport_retries == 0 {
        warnings.push(
            "Unbounded session without transport retries - one bus error ends the run".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Resolution: {}", summary.resolution);
            println!("  Frequency: {} Hz", summary.ranging_frequency_hz);
            println!("  Bus: {}", summary.bus);
            println!("  Sink: {}", summary.sink_type);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            "[estimator]\nenabled = false\n\n[telemetry]\nsink_type = \"log\"\ncommand = \"liquid_level\"\n",
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[telemetry]\nsink_type = \"udp\"\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("addr"));
        assert!(run_validate(&args).is_err());
    }
}
