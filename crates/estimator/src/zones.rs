//! Named zone tables

use contracts::{ContractError, Resolution};

/// Diamond around the centre of the 8x8 grid, inner four first
pub const CENTER_ZONES_8X8: [usize; 12] = [27, 28, 35, 36, 19, 20, 26, 29, 34, 37, 43, 44];

/// Inner four zones of the 4x4 grid
pub const CENTER_ZONES_4X4: [usize; 4] = [5, 6, 9, 10];

/// Centre table for a resolution
pub fn center_zones(resolution: Resolution) -> &'static [usize] {
    match resolution {
        Resolution::R4x4 => &CENTER_ZONES_4X4,
        Resolution::R8x8 => &CENTER_ZONES_8X8,
    }
}

/// Check that every index addresses a zone of `resolution`
pub fn validate_subset(subset: &[usize], resolution: Resolution) -> Result<(), ContractError> {
    if subset.is_empty() {
        return Err(ContractError::config_validation(
            "estimator.zones",
            "zone subset is empty",
        ));
    }
    if let Some(index) = subset.iter().find(|i| **i >= resolution.zone_count()) {
        return Err(ContractError::config_validation(
            "estimator.zones",
            format!(
                "zone {index} out of range for {resolution} ({} zones)",
                resolution.zone_count()
            ),
        ));
    }
    Ok(())
}
