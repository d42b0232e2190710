//! Bus trait for full-duplex exchanges

use std::io;

/// Synchronous full-duplex bus
///
/// One call is one chip-select cycle: every byte of `buf` is shifted out and
/// the byte clocked in at the same position replaces it.
pub trait Bus: Send {
    /// Exchange `buf` with the device in place
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Exchange a register write.
    ///
    /// The bytes on the wire are the same as for [`Bus::transfer`]; buses
    /// that model the register file use the hint to store the payload.
    fn transfer_write(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.transfer(buf)
    }
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).transfer(buf)
    }

    fn transfer_write(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).transfer_write(buf)
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).transfer(buf)
    }

    fn transfer_write(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).transfer_write(buf)
    }
}
