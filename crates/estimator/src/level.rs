//! Peak-signal liquid-level estimation

use contracts::{ContractError, Frame, Resolution};
use serde::Serialize;

use crate::zones::{center_zones, validate_subset};

/// Estimated liquid level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelReading {
    /// Mounting height minus measured distance (mm)
    ///
    /// Negative when the surface reads farther away than the vessel floor.
    pub height_mm: i32,

    /// Winning zone index
    pub zone: usize,

    /// Distance measured by the winning zone (mm)
    pub distance_mm: i16,

    /// Signal of the winning zone
    pub signal_per_spad: u32,
}

impl LevelReading {
    /// Whether the height lies within the mounting height
    pub fn is_within_mount(&self) -> bool {
        self.height_mm >= 0
    }
}

/// Estimate the liquid level from the strongest trusted zone in `subset`.
///
/// Zones without a target or with an untrusted status are ignored, as are
/// indices outside the frame. Only a strictly stronger signal replaces the
/// current pick, so equal signals resolve to the earliest zone in `subset`.
/// Returns `None` when no zone qualifies.
pub fn estimate(frame: &Frame, subset: &[usize], sensor_height_mm: i32) -> Option<LevelReading> {
    let mut best: Option<(usize, &contracts::Zone)> = None;

    for &index in subset {
        let Some(zone) = frame.zone(index) else {
            continue;
        };
        if !zone.is_usable() {
            continue;
        }
        match best {
            Some((_, current)) if zone.signal_per_spad <= current.signal_per_spad => {}
            _ => best = Some((index, zone)),
        }
    }

    best.map(|(index, zone)| LevelReading {
        height_mm: sensor_height_mm - i32::from(zone.distance_mm),
        zone: index,
        distance_mm: zone.distance_mm,
        signal_per_spad: zone.signal_per_spad,
    })
}

/// Estimator bound to a resolution and a validated zone subset
#[derive(Debug, Clone)]
pub struct LiquidLevelEstimator {
    resolution: Resolution,
    subset: Vec<usize>,
    sensor_height_mm: i32,
}

impl LiquidLevelEstimator {
    /// Use the centre table for `resolution`
    pub fn new(resolution: Resolution, sensor_height_mm: i32) -> Result<Self, ContractError> {
        Self::with_subset(resolution, center_zones(resolution).to_vec(), sensor_height_mm)
    }

    /// Use a custom zone table
    pub fn with_subset(
        resolution: Resolution,
        subset: Vec<usize>,
        sensor_height_mm: i32,
    ) -> Result<Self, ContractError> {
        validate_subset(&subset, resolution)?;
        if sensor_height_mm <= 0 {
            return Err(ContractError::config_validation(
                "estimator.sensor_height_mm",
                "must be greater than 0",
            ));
        }
        Ok(Self {
            resolution,
            subset,
            sensor_height_mm,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn subset(&self) -> &[usize] {
        &self.subset
    }

    pub fn sensor_height_mm(&self) -> i32 {
        self.sensor_height_mm
    }

    /// Estimate the level of one frame
    pub fn estimate(&self, frame: &Frame) -> Option<LevelReading> {
        if frame.resolution != self.resolution {
            tracing::warn!(
                expected = %self.resolution,
                actual = %frame.resolution,
                "frame resolution differs from estimator resolution"
            );
        }
        estimate(frame, &self.subset, self.sensor_height_mm)
    }
}
