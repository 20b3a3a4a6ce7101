//! Shared test fixtures: scripted transport and sector response builders.

// Allow dead code since this module is shared across multiple test files
// and not every helper is used in every file.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use sdlog_lib::constants::{RESPONSE_CRC_SIZE, RESPONSE_LEAD_SIZE, SECTOR_SIZE};
use sdlog_lib::crc::crc32;
use sdlog_lib::error::SdlogError;
use sdlog_lib::ready::FixedDelay;
use sdlog_lib::transport::Transport;
use sdlog_lib::{DataLogger, ProtocolConfig};
use std::collections::VecDeque;
use std::time::Duration;

/// Transport stub that replays a scripted byte stream and records every
/// frame written to it.
#[derive(Debug, Default)]
pub struct MockTransport {
    reads: VecDeque<u8>,
    pub writes: Vec<Vec<u8>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be handed out by subsequent `read_exact` calls.
    pub fn queue_response(&mut self, response: &[u8]) {
        self.reads.extend(response.iter().copied());
    }

    /// Frames written whose opcode byte matches.
    pub fn frames_with_opcode(&self, opcode: u8) -> usize {
        self.writes
            .iter()
            .filter(|frame| frame.first() == Some(&opcode))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SdlogError> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    async fn read_exact(&mut self, len: usize) -> Result<Bytes, SdlogError> {
        if self.reads.len() < len {
            return Err(SdlogError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "scripted stream exhausted: wanted {len} bytes, {} left",
                    self.reads.len()
                ),
            )));
        }
        let chunk: Vec<u8> = self.reads.drain(..len).collect();
        Ok(Bytes::from(chunk))
    }
}

/// A full 517-byte sector response. The trailing checksum is taken from
/// `crc` when given, otherwise computed correctly over the payload.
pub fn sector_response(payload: &[u8; SECTOR_SIZE], crc: Option<u32>) -> Vec<u8> {
    let crc = crc.unwrap_or_else(|| crc32(payload));
    let mut response = Vec::with_capacity(RESPONSE_LEAD_SIZE + SECTOR_SIZE + RESPONSE_CRC_SIZE);
    response.push(0x00);
    response.extend_from_slice(payload);
    response.extend_from_slice(&crc.to_be_bytes());
    response
}

/// A checksum that is guaranteed wrong for `payload`.
pub fn corrupted_crc(payload: &[u8; SECTOR_SIZE]) -> u32 {
    crc32(payload) ^ 1
}

/// Logger over a scripted transport with an immediate readiness source.
pub fn scripted_logger(
    transport: MockTransport,
    config: ProtocolConfig,
) -> DataLogger<MockTransport, FixedDelay> {
    DataLogger::new(transport, FixedDelay::new(Duration::ZERO), config)
}
