//! Wire encodings of a [`TelemetryCommand`]

use contracts::{TelemetryCommand, COMMAND_LEN};

/// Datagram size: 16 little-endian `i16`
pub const DATAGRAM_LEN: usize = COMMAND_LEN * 2;

/// Binary datagram, no header
pub fn encode_datagram(command: &TelemetryCommand) -> [u8; DATAGRAM_LEN] {
    let mut datagram = [0u8; DATAGRAM_LEN];
    for (slot, value) in datagram.chunks_exact_mut(2).zip(command.values()) {
        slot.copy_from_slice(&value.to_le_bytes());
    }
    datagram
}

/// Comma-separated decimal values
pub fn encode_body(command: &TelemetryCommand) -> String {
    command
        .values()
        .iter()
        .map(i16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Complete HTTP/1.0 request carrying the text body
pub fn encode_request(host: &str, command: &TelemetryCommand) -> String {
    let body = encode_body(command);
    format!(
        "POST / HTTP/1.0\r\nHost: {host}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}
