use crate::constants::{
    RESPONSE_CHUNK_COUNT, RESPONSE_CHUNK_SIZE, RESPONSE_CRC_SIZE, RESPONSE_LEAD_SIZE, SECTOR_SIZE,
};
use crate::crc::crc32;
use crate::error::SdlogError;
use crate::frame::{Command, CommandFrame, OpcodeMap};
use crate::ready::ReadySignal;
use crate::transport::Transport;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use zerocopy::IntoBytes;

/// Default ceiling for a single bus transfer.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Protocol-level knobs for a logger session.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Read/write opcode assignment sent on the wire.
    pub opcodes: OpcodeMap,
    /// Ceiling applied to each individual bus transfer.
    pub io_timeout: Duration,
    /// Optional ceiling on checksum-retry attempts per sector. `None`
    /// retries until the sector validates or the session is cancelled.
    pub max_attempts: Option<u32>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            opcodes: OpcodeMap::DOWNLOAD,
            io_timeout: DEFAULT_IO_TIMEOUT,
            max_attempts: None,
        }
    }
}

impl ProtocolConfig {
    pub fn with_opcodes(mut self, opcodes: OpcodeMap) -> Self {
        self.opcodes = opcodes;
        self
    }

    pub fn with_max_attempts(mut self, ceiling: u32) -> Self {
        self.max_attempts = Some(ceiling);
        self
    }
}

/// Result of a single sector-read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Payload validated against the trailing checksum.
    Valid(Bytes),
    /// Payload arrived but failed validation; the caller decides whether
    /// to retry.
    ChecksumMismatch { computed: u32, received: u32 },
}

impl FetchOutcome {
    /// Treat a mismatch as an error instead of retrying.
    pub fn into_payload(self, sector: u32) -> Result<Bytes, SdlogError> {
        match self {
            FetchOutcome::Valid(payload) => Ok(payload),
            FetchOutcome::ChecksumMismatch { computed, received } => {
                Err(SdlogError::ChecksumMismatch {
                    sector,
                    computed,
                    received,
                })
            }
        }
    }
}

/// A session with the logger over an exclusively-owned link.
///
/// Commands and responses strictly alternate; the link is held for the
/// lifetime of this value.
pub struct DataLogger<T, R> {
    transport: T,
    ready: R,
    config: ProtocolConfig,
    cancel: CancellationToken,
}

impl<T: Transport, R: ReadySignal> DataLogger<T, R> {
    pub fn new(transport: T, ready: R, config: ProtocolConfig) -> Self {
        Self {
            transport,
            ready,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed between retries and readiness polls; cancel it to
    /// abort an in-flight fetch or download.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build and send one command frame.
    pub async fn send_command(&mut self, command: Command) -> Result<(), SdlogError> {
        let frame = CommandFrame::build(command, self.config.opcodes);
        trace!("command frame: {}", hex::encode(frame.as_bytes()));
        timeout(self.config.io_timeout, self.transport.write_all(frame.as_bytes())).await??;
        Ok(())
    }

    /// Tell the firmware to leave transfer mode.
    pub async fn quit(&mut self) -> Result<(), SdlogError> {
        self.send_command(Command::Quit).await
    }

    /// One read-sector transaction: command, readiness wait, 517-byte
    /// response, checksum validation. Does not retry.
    ///
    /// The response is drained as one discarded lead byte, then the payload
    /// in 8-byte chunks, then the 4-byte trailer, each chunk a separate bus
    /// transaction. The trailer is interpreted big-endian; outbound frames
    /// encode their checksum little-endian. Both directions follow the
    /// firmware exactly.
    pub async fn read_sector(&mut self, sector: u32) -> Result<FetchOutcome, SdlogError> {
        self.send_command(Command::ReadSector(sector)).await?;
        self.ready.wait_ready(&self.cancel).await?;

        timeout(
            self.config.io_timeout,
            self.transport.read_exact(RESPONSE_LEAD_SIZE),
        )
        .await??;

        let mut payload = BytesMut::with_capacity(SECTOR_SIZE);
        for _ in 0..RESPONSE_CHUNK_COUNT {
            let chunk = timeout(
                self.config.io_timeout,
                self.transport.read_exact(RESPONSE_CHUNK_SIZE),
            )
            .await??;
            payload.extend_from_slice(&chunk);
        }
        let trailer = timeout(
            self.config.io_timeout,
            self.transport.read_exact(RESPONSE_CRC_SIZE),
        )
        .await??;

        let computed = crc32(&payload);
        let received = u32::from_be_bytes(trailer.as_ref().try_into()?);
        if computed == received {
            debug!(sector, "sector validated");
            Ok(FetchOutcome::Valid(payload.freeze()))
        } else {
            Ok(FetchOutcome::ChecksumMismatch { computed, received })
        }
    }

    /// Fetch `sector` until it validates.
    ///
    /// Retries immediately on checksum mismatch with no backoff. With no
    /// attempt ceiling configured this loops until the sector validates or
    /// the session token is cancelled, so corrupted data never reaches the
    /// caller.
    pub async fn fetch_sector(&mut self, sector: u32) -> Result<Bytes, SdlogError> {
        let mut attempts: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(SdlogError::Cancelled);
            }
            attempts += 1;
            match self.read_sector(sector).await? {
                FetchOutcome::Valid(payload) => return Ok(payload),
                FetchOutcome::ChecksumMismatch { computed, received } => {
                    warn!(
                        sector,
                        attempt = attempts,
                        "checksum mismatch (computed {computed:#010x}, received {received:#010x}), retrying"
                    );
                    if let Some(ceiling) = self.config.max_attempts {
                        if attempts >= ceiling {
                            return Err(SdlogError::RetriesExhausted { sector, attempts });
                        }
                    }
                }
            }
        }
    }

    /// Echo test: the firmware mirrors each byte back one transfer later.
    /// Returns the number of mismatched rounds.
    pub async fn loopback_test(&mut self, rounds: u32) -> Result<u32, SdlogError> {
        let mut errors = 0;
        for round in 1..=rounds {
            let sent = (round % 129) as u8;
            timeout(self.config.io_timeout, self.transport.write_all(&[sent])).await??;
            timeout(self.config.io_timeout, self.transport.read_exact(1)).await??;
            let echoed = timeout(self.config.io_timeout, self.transport.read_exact(1)).await??;
            if echoed[0] != sent {
                debug!(round, sent, echoed = echoed[0], "loopback mismatch");
                errors += 1;
            }
        }
        Ok(errors)
    }
}
