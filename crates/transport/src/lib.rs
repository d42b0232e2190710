//! # Transport
//!
//! Register transport for the ranging sensor.
//!
//! Responsibilities:
//! - Frame register requests (2-byte big-endian address + payload)
//! - Run one full-duplex exchange per request
//! - Report failures with the transport sentinel, never retry
//! - Convert big-endian 4-byte groups to host order (`swap_buffer`)
//!
//! ## Usage Example
//!
//! ```
//! use transport::{RegisterFileBus, RegisterTransport};
//!
//! let mut transport = RegisterTransport::new(RegisterFileBus::new());
//! transport.write_byte(0x7fff, 0x02).unwrap();
//! assert_eq!(transport.read_byte(0x7fff).unwrap(), 0x02);
//! ```

mod bus;
mod error;
mod mock;
mod register;
#[cfg(feature = "spidev")]
mod spidev;
mod swap;

pub use bus::Bus;
pub use error::{Result, TransportError};
pub use mock::RegisterFileBus;
pub use register::{RegisterTransport, ADDRESS_LEN};
#[cfg(feature = "spidev")]
pub use self::spidev::SpidevBus;
pub use swap::{swap_buffer, try_swap_buffer};
