//! TelemetryCommand - per-zone output sent to the actuator
//!
//! Built fresh every acquisition cycle and consumed immediately by the sink.

use serde::{Deserialize, Serialize};

use crate::{CommandLayout, Frame, Resolution};

/// Values per command
pub const COMMAND_LEN: usize = 16;

/// Value that leaves every actuator channel idle (target far away)
pub const SHUTDOWN_VALUE: i16 = 4000;

/// Sixteen signed values, one per actuator channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCommand {
    values: [i16; COMMAND_LEN],
}

impl TelemetryCommand {
    /// Wrap raw values
    pub const fn new(values: [i16; COMMAND_LEN]) -> Self {
        Self { values }
    }

    /// Same value on every channel
    pub const fn uniform(value: i16) -> Self {
        Self {
            values: [value; COMMAND_LEN],
        }
    }

    /// Command sent once when the session ends
    pub const fn shutdown() -> Self {
        Self::uniform(SHUTDOWN_VALUE)
    }

    /// Per-zone distances.
    ///
    /// A 4x4 frame maps one zone per channel. An 8x8 frame is reduced to 4x4 by
    /// taking the nearest distance of every 2x2 block, row-major.
    pub fn from_distances(frame: &Frame) -> Self {
        let mut values = [0i16; COMMAND_LEN];
        match frame.resolution {
            Resolution::R4x4 => {
                for (slot, zone) in values.iter_mut().zip(frame.zones.iter()) {
                    *slot = zone.distance_mm;
                }
            }
            Resolution::R8x8 => {
                let width = Resolution::R8x8.width();
                for (block, slot) in values.iter_mut().enumerate() {
                    let row = (block / 4) * 2;
                    let col = (block % 4) * 2;
                    *slot = [
                        row * width + col,
                        row * width + col + 1,
                        (row + 1) * width + col,
                        (row + 1) * width + col + 1,
                    ]
                    .iter()
                    .filter_map(|idx| frame.zone(*idx))
                    .map(|zone| zone.distance_mm)
                    .min()
                    .unwrap_or(SHUTDOWN_VALUE);
                }
            }
        }
        Self { values }
    }

    /// Liquid height on every channel, or `idle_value` when there is no reading
    pub fn from_level(height_mm: Option<i32>, idle_value: i16) -> Self {
        match height_mm {
            Some(height) => Self::uniform(saturate_i16(height)),
            None => Self::uniform(idle_value),
        }
    }

    /// Build according to the configured layout
    pub fn build(
        layout: CommandLayout,
        frame: &Frame,
        height_mm: Option<i32>,
        idle_value: i16,
    ) -> Self {
        match layout {
            CommandLayout::Distances => Self::from_distances(frame),
            CommandLayout::LiquidLevel => Self::from_level(height_mm, idle_value),
        }
    }

    /// Channel values
    pub fn values(&self) -> &[i16; COMMAND_LEN] {
        &self.values
    }
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
