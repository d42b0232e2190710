//! In-memory register file bus
//!
//! Decodes the register framing and serves reads/writes from a register file
//! covering the whole 16-bit address space. Plain transfers are reads; writes
//! arrive through [`Bus::transfer_write`]. Clones share the same registers, so
//! a simulated firmware can update registers while the transport owns another
//! handle.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bus::Bus;
use crate::register::ADDRESS_LEN;

const REGISTER_FILE_SIZE: usize = u16::MAX as usize + 1;

/// Register file bus
#[derive(Clone)]
pub struct RegisterFileBus {
    inner: Arc<Mutex<RegisterFileInner>>,
}

struct RegisterFileInner {
    registers: Vec<u8>,
    transfers: u64,
    pending_faults: u32,
}

impl RegisterFileBus {
    /// Create a zeroed register file
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegisterFileInner {
                registers: vec![0; REGISTER_FILE_SIZE],
                transfers: 0,
                pending_faults: 0,
            })),
        }
    }

    /// Set registers directly, bypassing the bus
    pub fn poke(&self, address: u16, values: &[u8]) {
        let mut inner = self.lock();
        let start = usize::from(address);
        let end = (start + values.len()).min(REGISTER_FILE_SIZE);
        inner.registers[start..end].copy_from_slice(&values[..end - start]);
    }

    /// Read registers directly, bypassing the bus
    pub fn peek(&self, address: u16, count: usize) -> Vec<u8> {
        let inner = self.lock();
        let start = usize::from(address);
        let end = (start + count).min(REGISTER_FILE_SIZE);
        inner.registers[start..end].to_vec()
    }

    /// Make the next `count` transfers fail
    pub fn fail_next(&self, count: u32) {
        self.lock().pending_faults = count;
    }

    /// Number of transfers seen (including failed ones)
    pub fn transfer_count(&self) -> u64 {
        self.lock().transfers
    }

    fn lock(&self) -> MutexGuard<'_, RegisterFileInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RegisterFileBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFileBus {
    /// Locate the payload window addressed by a frame
    fn window(buf: &[u8]) -> io::Result<(usize, usize)> {
        if buf.len() < ADDRESS_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "transfer shorter than address header",
            ));
        }

        let start = usize::from(u16::from_be_bytes([buf[0], buf[1]]));
        let len = buf.len() - ADDRESS_LEN;
        if start + len > REGISTER_FILE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("transfer of {len} bytes at {start:#06x} runs past the register file"),
            ));
        }
        Ok((start, len))
    }

    fn exchange(&self, buf: &mut [u8], write: bool) -> io::Result<()> {
        let mut inner = self.lock();
        inner.transfers += 1;

        if inner.pending_faults > 0 {
            inner.pending_faults -= 1;
            return Err(io::Error::other("injected bus fault"));
        }

        let (start, len) = Self::window(buf)?;
        if write {
            inner.registers[start..start + len].copy_from_slice(&buf[ADDRESS_LEN..]);
        } else {
            buf[ADDRESS_LEN..].copy_from_slice(&inner.registers[start..start + len]);
        }
        // address phase clocks in nothing meaningful
        buf[..ADDRESS_LEN].fill(0);
        Ok(())
    }
}

impl Bus for RegisterFileBus {
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.exchange(buf, false)
    }

    fn transfer_write(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.exchange(buf, true)
    }
}
