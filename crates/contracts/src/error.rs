//! Layered error definitions
//!
//! Categorized by source: config / transport / device / network / calibration

use thiserror::Error;

/// Status reported by the register transport for any failed bus exchange.
pub const TRANSPORT_FAILURE_STATUS: u8 = 255;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Bus exchange failed
    #[error("transport error at register {address:#06x} (status {status}): {message}")]
    Transport {
        address: u16,
        status: u8,
        message: String,
    },

    // ===== Device Errors =====
    /// Device did not answer the alive check
    #[error("device not responding: {message}")]
    Liveness { message: String },

    /// Device failed to reach the ready state
    #[error("device initialization failed: {message}")]
    Initialization { message: String },

    /// Malformed frame produced by a device
    #[error("invalid frame: {message}")]
    InvalidFrame { message: String },

    // ===== Network Errors =====
    /// Socket creation, connect, send or receive failure
    #[error("sink '{sink_name}' network error: {message}")]
    Network { sink_name: String, message: String },

    // ===== Calibration Errors =====
    /// Calibration buffer rejected
    #[error("calibration buffer error: {message}")]
    Calibration { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error carrying the failure sentinel
    pub fn transport(address: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            address,
            status: TRANSPORT_FAILURE_STATUS,
            message: message.into(),
        }
    }

    /// Create liveness error
    pub fn liveness(message: impl Into<String>) -> Self {
        Self::Liveness {
            message: message.into(),
        }
    }

    /// Create initialization error
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Create network error
    pub fn network(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create calibration error
    pub fn calibration(message: impl Into<String>) -> Self {
        Self::Calibration {
            message: message.into(),
        }
    }

    /// Whether this error came from the bus
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_carries_sentinel() {
        let err = ContractError::transport(0x7fff, "spi transfer failed");
        match err {
            ContractError::Transport { status, address, .. } => {
                assert_eq!(status, 255);
                assert_eq!(address, 0x7fff);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_includes_register() {
        let err = ContractError::transport(0x0001, "boom");
        assert!(err.to_string().contains("0x0001"));
        assert!(err.is_transport());
    }
}
