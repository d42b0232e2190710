//! # Acquisition
//!
//! Frame acquisition and the relay session loop.
//!
//! Responsibilities:
//! - Bring the sensor up (liveness, init, configuration, start)
//! - Poll for data-ready with a host-side delay between checks
//! - Fetch frames and hand them to the estimator and the telemetry sink
//! - Stop on a frame bound, a stop request or a bus failure
//!
//! ## Usage Example
//!
//! ```ignore
//! use acquisition::{SensorBringUp, Session, SimulatedSensor};
//!
//! let mut device = SimulatedSensor::from_config(&blueprint.simulation);
//! SensorBringUp::from_config(&blueprint.sensor).bring_up(&mut device)?;
//!
//! let mut session = Session::from_blueprint(device, sink, &blueprint)?;
//! let stop = session.stop_handle();
//! let (stats, outcome) = session.run().await;
//! ```

mod bringup;
mod error;
mod scheduler;
mod session;
mod simulated;

pub use bringup::{
    probe_liveness, DeviceIdentity, SensorBringUp, DEVICE_ID_REG, EXPECTED_DEVICE_ID,
    EXPECTED_REVISION, PAGE_SELECT_REG, REVISION_REG,
};
pub use error::{AcquisitionError, Result};
pub use scheduler::{
    AcquisitionScheduler, SchedulerConfig, SchedulerCounters, SchedulerState, StopHandle,
};
pub use session::{Session, SessionStats, Termination};
pub use simulated::SimulatedSensor;
