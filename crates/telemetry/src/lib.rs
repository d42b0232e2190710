//! # Telemetry
//!
//! Encodes 16-value commands and sends them to the actuator.
//!
//! Wire formats:
//! - UDP: one 32-byte datagram of little-endian `i16`, fire-and-forget
//! - HTTP: `POST / HTTP/1.0` with a comma-separated text body, one connection per command
//!
//! A failed send is reported to the caller, which logs it and moves on to the
//! next frame. Commands are never resent.
//!
//! ## Usage Example
//!
//! ```ignore
//! use telemetry::create_sender;
//! use contracts::{TelemetryCommand, TelemetrySink};
//!
//! let mut sender = create_sender(&blueprint.telemetry).await?;
//! sender.send(&TelemetryCommand::uniform(166)).await?;
//! ```

pub mod encode;
pub mod error;
pub mod metrics;
pub mod sender;
pub mod sinks;

pub use contracts::{TelemetryCommand, TelemetrySink};
pub use encode::{encode_body, encode_datagram, encode_request, DATAGRAM_LEN};
pub use error::TelemetryError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sender::{create_sender, SinkKind, TelemetrySender};
pub use sinks::{HttpSink, LogSink, UdpSink};
