use std::array::TryFromSliceError;
use std::io;
use thiserror::Error;

/// The primary error type for the `sdlog` library.
///
/// Checksum mismatches are the only condition recovered locally (the fetch
/// loop retries them); everything else is surfaced to the caller with
/// enough context to diagnose without re-deriving state.
#[derive(Error, Debug)]
pub enum SdlogError {
    #[error("invalid sector length: expected {expected} bytes, got {actual}")]
    InvalidSectorLength { expected: usize, actual: usize },

    #[error("checksum mismatch on sector {sector}: computed {computed:#010x}, received {received:#010x}")]
    ChecksumMismatch { sector: u32, computed: u32, received: u32 },

    #[error("sector {sector} failed validation after {attempts} attempts")]
    RetriesExhausted { sector: u32, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timeout during transfer: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("GPIO error: {0}")]
    Gpio(#[from] gpio_cdev::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("record sink error: {0}")]
    Sink(#[from] csv::Error),

    #[error("record encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<TryFromSliceError> for SdlogError {
    fn from(_: TryFromSliceError) -> Self {
        SdlogError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated checksum trailer",
        ))
    }
}
