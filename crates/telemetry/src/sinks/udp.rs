//! UdpSink - binary datagram per command, fire-and-forget

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, TelemetryCommand, TelemetrySink};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use crate::encode::{encode_datagram, DATAGRAM_LEN};

/// Configuration for UdpSink
#[derive(Debug, Clone)]
pub struct UdpSinkConfig {
    /// Actuator address
    pub addr: SocketAddr,
}

impl UdpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        Ok(Self {
            addr: super::parse_addr(params)?,
        })
    }
}

/// Sink that sends each command as one 32-byte datagram
pub struct UdpSink {
    name: String,
    config: UdpSinkConfig,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    /// Bind an ephemeral port and connect it to the actuator
    #[instrument(name = "udp_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: UdpSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "UdpSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for the sender factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = UdpSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation("telemetry.params.addr", e))?;

        let message_name = name.clone();
        Self::new(name, config)
            .await
            .map_err(|e| ContractError::network(message_name, e.to_string()))
    }

    pub fn target(&self) -> SocketAddr {
        self.config.addr
    }

    /// Send one datagram, returning the bytes sent
    pub async fn send_command(&mut self, command: &TelemetryCommand) -> Result<usize, ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::network(&self.name, "socket closed"))?;

        let datagram = encode_datagram(command);
        let sent = socket
            .send(&datagram)
            .await
            .map_err(|e| ContractError::network(&self.name, format!("send failed: {e}")))?;
        if sent != DATAGRAM_LEN {
            return Err(ContractError::network(
                &self.name,
                format!("short datagram: {sent} of {DATAGRAM_LEN} bytes"),
            ));
        }

        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(sent)
    }
}

impl TelemetrySink for UdpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "udp_sink_send", skip(self, command), fields(sink = %self.name))]
    async fn send(&mut self, command: &TelemetryCommand) -> Result<(), ContractError> {
        self.send_command(command).await.map(|_| ())
    }

    #[instrument(name = "udp_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "UdpSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "192.168.4.1:12345".to_string());
        let config = UdpSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 12345);

        params.insert("addr".to_string(), "not-an-addr".to_string());
        assert!(UdpSinkConfig::from_params(&params).is_err());
        assert!(UdpSinkConfig::from_params(&HashMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_udp_sink_delivers_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = UdpSinkConfig {
            addr: receiver.local_addr().unwrap(),
        };
        let mut sink = UdpSink::new("pico", config).await.unwrap();

        sink.send(&TelemetryCommand::uniform(166)).await.unwrap();

        let mut buf = [0u8; 64];
        let len = receiver.recv(&mut buf).await.unwrap();
        assert_eq!(len, DATAGRAM_LEN);
        assert_eq!(&buf[..2], &166i16.to_le_bytes());
    }

    #[tokio::test]
    async fn test_udp_sink_closed_send_fails() {
        let config = UdpSinkConfig {
            addr: "127.0.0.1:19997".parse().unwrap(),
        };
        let mut sink = UdpSink::new("pico", config).await.unwrap();
        sink.close().await.unwrap();

        let err = sink.send(&TelemetryCommand::shutdown()).await.unwrap_err();
        assert!(matches!(err, ContractError::Network { .. }));
    }
}
