//! Acquisition error types

use contracts::ContractError;
use thiserror::Error;

use crate::SchedulerState;

/// Acquisition error
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Operation not allowed in the current scheduler state
    #[error("cannot {operation} while scheduler is {state}")]
    InvalidState {
        /// Rejected operation
        operation: &'static str,
        /// Scheduler state at the time
        state: SchedulerState,
    },

    /// Device or bus failure
    #[error(transparent)]
    Device(#[from] ContractError),
}

impl AcquisitionError {
    /// Whether the failure came from the register bus
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Device(err) if err.is_transport())
    }
}

/// Acquisition Result type alias
pub type Result<T> = std::result::Result<T, AcquisitionError>;
