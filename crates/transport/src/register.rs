//! Addressed register access over a [`Bus`]

use tracing::debug;

use crate::bus::Bus;
use crate::error::{Result, TransportError};

/// Bytes of address header in front of every payload
pub const ADDRESS_LEN: usize = 2;

/// Register transport
///
/// Request frame: `[addr_hi, addr_lo, payload...]`, the big-endian register
/// address followed by exactly the payload bytes. Reads and writes share the
/// framing; reads shift out zeros and return the bytes that follow the 2-byte
/// address echo.
pub struct RegisterTransport<B> {
    bus: B,
    frame: Vec<u8>,
}

impl<B: Bus> RegisterTransport<B> {
    /// Wrap a bus
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            frame: Vec::new(),
        }
    }

    /// Underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying bus, mutable
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Read one register
    pub fn read_byte(&mut self, address: u16) -> Result<u8> {
        let mut value = [0u8; 1];
        self.read_into(address, &mut value)?;
        Ok(value[0])
    }

    /// Write one register
    pub fn write_byte(&mut self, address: u16, value: u8) -> Result<()> {
        self.write_multi(address, &[value])
    }

    /// Read `count` consecutive registers
    pub fn read_multi(&mut self, address: u16, count: usize) -> Result<Vec<u8>> {
        let mut values = vec![0u8; count];
        self.read_into(address, &mut values)?;
        Ok(values)
    }

    /// Read consecutive registers into `out`
    ///
    /// An empty `out` performs no exchange.
    pub fn read_into(&mut self, address: u16, out: &mut [u8]) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }

        self.prepare(address, out.len());
        let result = self.bus.transfer(&mut self.frame);
        check(result, address)?;
        out.copy_from_slice(&self.frame[ADDRESS_LEN..]);
        Ok(())
    }

    /// Write consecutive registers
    ///
    /// An empty `values` performs no exchange.
    pub fn write_multi(&mut self, address: u16, values: &[u8]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        self.prepare(address, values.len());
        self.frame[ADDRESS_LEN..].copy_from_slice(values);
        let result = self.bus.transfer_write(&mut self.frame);
        check(result, address)
    }

    fn prepare(&mut self, address: u16, payload_len: usize) {
        self.frame.clear();
        self.frame.extend_from_slice(&address.to_be_bytes());
        self.frame.resize(ADDRESS_LEN + payload_len, 0);
    }
}

fn check(result: std::io::Result<()>, address: u16) -> Result<()> {
    result.map_err(|source| {
        debug!(address = format!("{address:#06x}"), error = %source, "bus exchange failed");
        TransportError::Bus { address, source }
    })
}
