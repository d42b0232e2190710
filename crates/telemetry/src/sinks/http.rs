//! HttpSink - text body over HTTP/1.0, fresh connection per command

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use contracts::{ContractError, TelemetryCommand, TelemetrySink};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::encode::encode_request;

/// Response bytes read after each request
pub const RESPONSE_LIMIT: usize = 1024;

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Actuator address
    pub addr: SocketAddr,
    /// Host header value
    pub host: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// How long to wait for the (informational) response
    pub response_timeout: Duration,
}

impl HttpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr = super::parse_addr(params)?;
        let host = params
            .get("host")
            .cloned()
            .unwrap_or_else(|| addr.ip().to_string());
        let connect_timeout = parse_millis(params, "connect_timeout_ms", 1000)?;
        let response_timeout = parse_millis(params, "response_timeout_ms", 1000)?;

        Ok(Self {
            addr,
            host,
            connect_timeout,
            response_timeout,
        })
    }
}

fn parse_millis(
    params: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<Duration, String> {
    match params.get(key) {
        Some(value) => value
            .parse()
            .map(Duration::from_millis)
            .map_err(|e| format!("invalid '{key}' value '{value}': {e}")),
        None => Ok(Duration::from_millis(default)),
    }
}

/// Sink that POSTs each command as a comma-separated text body
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
}

impl HttpSink {
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Create from params (for the sender factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let config = HttpSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation("telemetry.params", e))?;
        Ok(Self::new(name, config))
    }

    pub fn target(&self) -> SocketAddr {
        self.config.addr
    }

    /// Connect, write the request, read the response, close.
    ///
    /// Returns the request size. The response is only logged.
    pub async fn send_command(&mut self, command: &TelemetryCommand) -> Result<usize, ContractError> {
        let request = encode_request(&self.config.host, command);

        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(self.config.addr))
            .await
            .map_err(|_| ContractError::network(&self.name, "connect timed out"))?
            .map_err(|e| ContractError::network(&self.name, format!("connect failed: {e}")))?;

        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| ContractError::network(&self.name, format!("write failed: {e}")))?;

        let mut response = [0u8; RESPONSE_LIMIT];
        match timeout(self.config.response_timeout, stream.read(&mut response)).await {
            Ok(Ok(len)) => {
                let text = String::from_utf8_lossy(&response[..len]);
                debug!(
                    sink = %self.name,
                    bytes = len,
                    status_line = text.lines().next().unwrap_or_default(),
                    "response received"
                );
            }
            Ok(Err(e)) => debug!(sink = %self.name, error = %e, "response read failed"),
            Err(_) => debug!(sink = %self.name, "no response before timeout"),
        }

        if let Err(e) = stream.shutdown().await {
            debug!(sink = %self.name, error = %e, "shutdown failed");
        }
        Ok(request.len())
    }
}

impl TelemetrySink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "http_sink_send", skip(self, command), fields(sink = %self.name))]
    async fn send(&mut self, command: &TelemetryCommand) -> Result<(), ContractError> {
        self.send_command(command).await.map(|_| ())
    }

    #[instrument(name = "http_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        // no connection outlives a send
        Ok(())
    }
}
