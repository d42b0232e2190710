//! Linux spidev backend

use std::io;

use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::info;

use crate::bus::Bus;

/// SPI bus backed by `/dev/spidevB.C`
pub struct SpidevBus {
    spi: Spidev,
    tx: Vec<u8>,
}

impl SpidevBus {
    /// Open and configure the device node
    pub fn open(path: &str, speed_hz: u32, mode: u8) -> io::Result<Self> {
        let mode_flags = match mode {
            0 => SpiModeFlags::SPI_MODE_0,
            1 => SpiModeFlags::SPI_MODE_1,
            2 => SpiModeFlags::SPI_MODE_2,
            3 => SpiModeFlags::SPI_MODE_3,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid SPI mode {other}"),
                ))
            }
        };

        let mut spi = Spidev::open(path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(mode_flags)
            .build();
        spi.configure(&options)?;

        info!(device = path, speed_hz, mode, "SPI bus configured");

        Ok(Self {
            spi,
            tx: Vec::new(),
        })
    }
}

impl Bus for SpidevBus {
    fn transfer(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.tx.clear();
        self.tx.extend_from_slice(buf);
        let mut transfer = SpidevTransfer::read_write(&self.tx, buf);
        self.spi.transfer(&mut transfer)
    }
}
