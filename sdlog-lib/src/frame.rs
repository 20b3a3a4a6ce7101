use crate::constants::FRAME_CRC_COVERAGE;
use crate::crc::crc32;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Opcode that tells the firmware to leave transfer mode.
pub const OPCODE_QUIT: u8 = 0x00;

/// Read/write opcode assignment.
///
/// The firmware-facing tools in circulation disagree on which of
/// `0x01`/`0x02` selects a read, so the assignment is carried as
/// configuration instead of being baked into the codec. Correcting it
/// against the real firmware touches only this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMap {
    pub read_sector: u8,
    pub write_sector: u8,
}

impl OpcodeMap {
    /// Assignment used by the download tooling: read = 0x01, write = 0x02.
    pub const DOWNLOAD: OpcodeMap = OpcodeMap {
        read_sector: 0x01,
        write_sector: 0x02,
    };

    /// Swapped assignment observed in the write-command tooling.
    pub const WRITE_TEST: OpcodeMap = OpcodeMap {
        read_sector: 0x02,
        write_sector: 0x01,
    };
}

impl Default for OpcodeMap {
    fn default() -> Self {
        Self::DOWNLOAD
    }
}

/// Commands the logger firmware accepts over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Leave transfer mode. The sector index is sent as zero.
    Quit,
    /// Request one 512-byte sector.
    ReadSector(u32),
    /// Announce a sector write. The payload upload that follows is a
    /// separate transfer and is not built here.
    WriteSector(u32),
}

impl Command {
    pub fn opcode(self, opcodes: OpcodeMap) -> u8 {
        match self {
            Command::Quit => OPCODE_QUIT,
            Command::ReadSector(_) => opcodes.read_sector,
            Command::WriteSector(_) => opcodes.write_sector,
        }
    }

    pub fn sector_index(self) -> u32 {
        match self {
            Command::Quit => 0,
            Command::ReadSector(sector) | Command::WriteSector(sector) => sector,
        }
    }
}

/// Command frame in wire order: opcode, little-endian sector index,
/// little-endian CRC-32 over the preceding five bytes (never over itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommandFrame {
    pub opcode: u8,
    pub sector: U32,
    pub crc: U32,
}

impl CommandFrame {
    pub fn build(command: Command, opcodes: OpcodeMap) -> Self {
        let mut frame = CommandFrame {
            opcode: command.opcode(opcodes),
            sector: U32::new(command.sector_index()),
            crc: U32::new(0),
        };
        frame.crc = U32::new(crc32(&frame.as_bytes()[..FRAME_CRC_COVERAGE]));
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FRAME_SIZE;

    #[test]
    fn wire_size() {
        assert_eq!(std::mem::size_of::<CommandFrame>(), FRAME_SIZE);
    }

    #[test]
    fn quit_forces_sector_zero() {
        let frame = CommandFrame::build(Command::Quit, OpcodeMap::DOWNLOAD);
        assert_eq!(frame.opcode, OPCODE_QUIT);
        assert_eq!(frame.sector.get(), 0);
    }
}
