//! Transport error types

use contracts::{ContractError, TRANSPORT_FAILURE_STATUS};
use thiserror::Error;

/// Transport error
///
/// Every variant reports the same sentinel status through [`TransportError::status`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Bus exchange failed
    #[error("bus exchange failed at register {address:#06x}: {source}")]
    Bus {
        /// Register address of the request
        address: u16,
        /// Underlying bus error
        #[source]
        source: std::io::Error,
    },

    /// Buffer length is not a multiple of 4
    #[error("buffer of {len} bytes is not a multiple of 4")]
    UnalignedBuffer {
        /// Buffer length
        len: usize,
    },
}

impl TransportError {
    /// Status code callers see for any transport failure
    pub fn status(&self) -> u8 {
        TRANSPORT_FAILURE_STATUS
    }

    /// Register address involved, if any
    pub fn address(&self) -> Option<u16> {
        match self {
            Self::Bus { address, .. } => Some(*address),
            Self::UnalignedBuffer { .. } => None,
        }
    }
}

impl From<TransportError> for ContractError {
    fn from(err: TransportError) -> Self {
        ContractError::Transport {
            address: err.address().unwrap_or_default(),
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// Transport Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
