use crate::error::SdlogError;
use async_trait::async_trait;
use bytes::Bytes;
use spidev::{SpiModeFlags, Spidev, SpidevOptions};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Half-duplex, exclusively-owned byte link to the logger.
///
/// `read_exact` returns exactly `len` bytes or fails; a short transfer is
/// an I/O error, never silently padded. The link carries one transfer at a
/// time — no two frames are ever in flight.
#[async_trait]
pub trait Transport: Send {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SdlogError>;
    async fn read_exact(&mut self, len: usize) -> Result<Bytes, SdlogError>;
}

/// SPI device node transport (Linux `spidev`).
pub struct SpiTransport {
    spi: Spidev,
}

impl SpiTransport {
    /// Open and configure an SPI device node, e.g. `/dev/spidev0.1`.
    pub fn open(path: &Path, speed_hz: u32, mode: u8) -> Result<Self, SdlogError> {
        let mut spi = Spidev::open(path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(mode_flags(mode)?)
            .build();
        spi.configure(&options)?;
        info!("opened {} at {} Hz, mode {}", path.display(), speed_hz, mode);
        Ok(Self { spi })
    }
}

fn mode_flags(mode: u8) -> Result<SpiModeFlags, SdlogError> {
    match mode {
        0 => Ok(SpiModeFlags::SPI_MODE_0),
        1 => Ok(SpiModeFlags::SPI_MODE_1),
        2 => Ok(SpiModeFlags::SPI_MODE_2),
        3 => Ok(SpiModeFlags::SPI_MODE_3),
        _ => Err(SdlogError::Configuration(format!(
            "SPI mode must be 0-3, got {mode}"
        ))),
    }
}

#[async_trait]
impl Transport for SpiTransport {
    // Transfers stay on the driving task: at the logger's clock rates a
    // chunk is on the bus for well under a millisecond.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SdlogError> {
        self.spi.write_all(bytes)?;
        Ok(())
    }

    async fn read_exact(&mut self, len: usize) -> Result<Bytes, SdlogError> {
        let mut buf = vec![0u8; len];
        self.spi.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}
