//! Frame - Ranging device output
//!
//! One complete snapshot of every zone for a single ranging cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ContractError;

/// Largest grid the sensor supports (8x8)
pub const MAX_ZONES: usize = 64;

/// Sensor grid resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// 4x4 grid, 16 zones
    #[serde(rename = "4x4")]
    R4x4,
    /// 8x8 grid, 64 zones
    #[default]
    #[serde(rename = "8x8")]
    R8x8,
}

impl Resolution {
    /// Zones per frame
    pub const fn zone_count(self) -> usize {
        match self {
            Self::R4x4 => 16,
            Self::R8x8 => 64,
        }
    }

    /// Zones per row
    pub const fn width(self) -> usize {
        match self {
            Self::R4x4 => 4,
            Self::R8x8 => 8,
        }
    }

    /// Highest ranging frequency the device accepts at this resolution
    pub const fn max_frequency_hz(self) -> u8 {
        match self {
            Self::R4x4 => 60,
            Self::R8x8 => 15,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::R4x4 => write!(f, "4x4"),
            Self::R8x8 => write!(f, "8x8"),
        }
    }
}

/// Per-zone target status code as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetStatus(pub u8);

impl TargetStatus {
    pub const NOT_UPDATED: Self = Self(0);
    pub const LOW_SIGNAL_SPAD_ARRAY: Self = Self(1);
    pub const TARGET_PHASE: Self = Self(2);
    pub const SIGMA_TOO_HIGH: Self = Self(3);
    pub const TARGET_CONSISTENCY_FAILED: Self = Self(4);
    pub const RANGE_VALID: Self = Self(5);
    pub const WRAP_AROUND_NOT_PERFORMED: Self = Self(6);
    pub const RATE_CONSISTENCY_FAILED: Self = Self(7);
    pub const LOW_SIGNAL_CURRENT_TARGET: Self = Self(8);
    pub const RANGE_VALID_LARGE_PULSE: Self = Self(9);
    pub const NO_PREVIOUS_TARGET: Self = Self(10);
    pub const MEASUREMENT_CONSISTENCY_FAILED: Self = Self(11);
    pub const BLURRED_BY_OTHER_TARGET: Self = Self(12);
    pub const INCONSISTENT_DATA: Self = Self(13);
    pub const NO_TARGET: Self = Self(255);

    /// Statuses usable for estimation
    pub const VALID: [Self; 3] = [
        Self::RANGE_VALID,
        Self::WRAP_AROUND_NOT_PERFORMED,
        Self::RANGE_VALID_LARGE_PULSE,
    ];

    /// Raw device code
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Whether the range behind this status can be trusted
    pub fn is_valid(self) -> bool {
        Self::VALID.contains(&self)
    }

    /// Short human-readable label
    pub fn describe(self) -> &'static str {
        match self.0 {
            0 => "not updated",
            1 => "signal too low on SPAD array",
            2 => "target phase",
            3 => "sigma too high",
            4 => "target consistency failed",
            5 => "range valid",
            6 => "wrap around not performed",
            7 => "rate consistency failed",
            8 => "signal too low for current target",
            9 => "range valid with large pulse",
            10 => "range valid, no target at previous range",
            11 => "measurement consistency failed",
            12 => "target blurred by another one",
            13 => "target detected but inconsistent data",
            255 => "no target detected",
            _ => "unknown",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.describe())
    }
}

/// One cell of the measurement grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Zone {
    /// Measured distance (mm)
    pub distance_mm: i16,

    /// Signal rate per SPAD (kcps/SPAD, device fixed point)
    pub signal_per_spad: u32,

    /// Device status code
    pub target_status: TargetStatus,

    /// Number of targets detected in this zone
    pub nb_target_detected: u8,
}

impl Zone {
    /// Zone with a detected target
    pub fn target(distance_mm: i16, signal_per_spad: u32, target_status: TargetStatus) -> Self {
        Self {
            distance_mm,
            signal_per_spad,
            target_status,
            nb_target_detected: 1,
        }
    }

    /// Zone without any detected target
    pub fn empty() -> Self {
        Self {
            target_status: TargetStatus::NO_TARGET,
            ..Default::default()
        }
    }

    /// Has at least one target with a usable status
    pub fn is_usable(&self) -> bool {
        self.nb_target_detected > 0 && self.target_status.is_valid()
    }
}

/// Complete ranging snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Grid resolution, fixed for the session
    pub resolution: Resolution,

    /// Device stream counter for this frame
    pub stream_count: u8,

    /// Zone measurements, row-major, `resolution.zone_count()` entries
    pub zones: Vec<Zone>,
}

impl Frame {
    /// Build a frame, checking the zone count against the resolution
    pub fn new(
        resolution: Resolution,
        stream_count: u8,
        zones: Vec<Zone>,
    ) -> Result<Self, ContractError> {
        if zones.len() != resolution.zone_count() {
            return Err(ContractError::InvalidFrame {
                message: format!(
                    "{} frame needs {} zones, got {}",
                    resolution,
                    resolution.zone_count(),
                    zones.len()
                ),
            });
        }
        Ok(Self {
            resolution,
            stream_count,
            zones,
        })
    }

    /// Frame where no zone saw a target
    pub fn empty(resolution: Resolution) -> Self {
        Self {
            resolution,
            stream_count: 0,
            zones: vec![Zone::empty(); resolution.zone_count()],
        }
    }

    /// Zone by index
    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    /// Mutable zone by index
    pub fn zone_mut(&mut self, index: usize) -> Option<&mut Zone> {
        self.zones.get_mut(index)
    }

    /// Number of zones with a usable target
    pub fn usable_zone_count(&self) -> usize {
        self.zones.iter().filter(|z| z.is_usable()).count()
    }
}
