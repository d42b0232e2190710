//! # Calibration
//!
//! Crosstalk calibration blob decoding.
//!
//! The device hands out its crosstalk data as an opaque blob of big-endian
//! 4-byte groups. Blocks inside the blob are found by their 16-bit tag:
//! - `0xA128`: 144 shape bins (`u16`)
//! - `0x9FFC`: per-zone signal grid (`u32`, scaled down by 2048)
//!
//! ## Usage Example
//!
//! ```ignore
//! use calibration::{CalibrationBuffer, DecodedCalibration};
//!
//! let buffer = CalibrationBuffer::new(device.get_caldata_xtalk()?)?;
//! let decoded = DecodedCalibration::from_blocks(buffer.decode(Resolution::R8x8));
//! if let Some(grid) = decoded.signal_grid() {
//!     println!("zone 0: {} kcps", grid[0]);
//! }
//! ```

mod block;
mod buffer;

pub use block::{
    CalibrationBlock, DecodedCalibration, SHAPE_BIN_COUNT, SIGNAL_GRID_SCALE, TAG_SHAPE_BINS,
    TAG_SIGNAL_GRID,
};
pub use buffer::{CalibrationBuffer, XTALK_BUFFER_SIZE};
