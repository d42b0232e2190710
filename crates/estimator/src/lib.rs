//! # Estimator
//!
//! Liquid-level estimation over a single ranging frame.
//!
//! The estimator looks at a fixed subset of zones around the grid centre,
//! keeps the ones with a trusted target, and takes the distance of the
//! strongest return. The liquid height is the mounting height minus that
//! distance.
//!
//! ## Usage Example
//!
//! ```
//! use contracts::{Frame, Resolution, TargetStatus, Zone};
//! use estimator::LiquidLevelEstimator;
//!
//! let estimator = LiquidLevelEstimator::new(Resolution::R8x8, 216).unwrap();
//! let mut frame = Frame::empty(Resolution::R8x8);
//! frame.zones[27] = Zone::target(50, 1200, TargetStatus::RANGE_VALID);
//!
//! let reading = estimator.estimate(&frame).unwrap();
//! assert_eq!(reading.height_mm, 166);
//! ```

mod level;
mod zones;

pub use level::{estimate, LevelReading, LiquidLevelEstimator};
pub use zones::{center_zones, validate_subset, CENTER_ZONES_4X4, CENTER_ZONES_8X8};
