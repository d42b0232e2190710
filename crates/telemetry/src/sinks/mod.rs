//! Sink implementations
//!
//! Contains UdpSink, HttpSink, and LogSink.

mod http;
mod log;
mod udp;

pub use self::http::{HttpSink, HttpSinkConfig, RESPONSE_LIMIT};
pub use self::log::LogSink;
pub use self::udp::{UdpSink, UdpSinkConfig};

use std::collections::HashMap;
use std::net::SocketAddr;

/// Parse the mandatory `addr` parameter
pub(crate) fn parse_addr(params: &HashMap<String, String>) -> Result<SocketAddr, String> {
    let addr_str = params
        .get("addr")
        .ok_or_else(|| "missing 'addr' parameter".to_string())?;

    addr_str
        .parse()
        .map_err(|e| format!("invalid address '{}': {}", addr_str, e))
}
