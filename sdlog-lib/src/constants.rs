// Wire protocol constants for the SPI data logger.

use std::time::Duration;

/// Storage sector size in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Command frame wire size: opcode + sector index + CRC-32.
pub const FRAME_SIZE: usize = 9;

/// Leading portion of a command frame covered by its CRC (opcode + sector index).
pub const FRAME_CRC_COVERAGE: usize = 5;

/// Ignorable lead byte preceding each sector response.
pub const RESPONSE_LEAD_SIZE: usize = 1;

/// Payload bytes are drained in fixed chunks; each chunk is one bus transaction.
pub const RESPONSE_CHUNK_SIZE: usize = 8;

/// Number of payload chunks per sector response.
pub const RESPONSE_CHUNK_COUNT: usize = SECTOR_SIZE / RESPONSE_CHUNK_SIZE;

/// Trailing checksum size of a sector response.
pub const RESPONSE_CRC_SIZE: usize = 4;

/// Total sector response size: lead byte + payload + trailing checksum.
pub const RESPONSE_SIZE: usize = RESPONSE_LEAD_SIZE + SECTOR_SIZE + RESPONSE_CRC_SIZE;

/// Number of 16-bit values per sample in the fixed firmware layout.
pub const DEFAULT_VALUES_PER_SAMPLE: u16 = 16;

/// Labeled 16-bit channels trailing the tick counter in each sample.
pub const FIELD_COUNT: usize = 14;

/// First sector of the data region on the logger's card.
pub const DEFAULT_FIRST_DATA_SECTOR: u32 = 644;

/// Default SPI clock for the download link.
pub const DEFAULT_SPI_HZ: u32 = 125_000;

/// Default interval between readiness-line polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);
