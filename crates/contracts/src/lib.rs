//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the relay.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Data path
//! - `RangingDevice` produces a `Frame` per ranging cycle
//! - the estimator reads the frame and derives a liquid level
//! - a `TelemetryCommand` (16 values) is built from the frame and handed to a `TelemetrySink`

mod blueprint;
mod command;
mod device;
mod error;
mod frame;
mod sink;

pub use blueprint::*;
pub use command::*;
pub use device::{PowerMode, RangingDevice};
pub use error::*;
pub use frame::*;
pub use sink::*;
