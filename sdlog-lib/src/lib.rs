pub mod constants;
pub mod crc;
pub mod device;
pub mod download;
pub mod error;
pub mod frame;
pub mod ready;
pub mod sample;
pub mod sink;
pub mod transport;

// Re-export the session entry points for easy access
pub use device::{DataLogger, FetchOutcome, ProtocolConfig};
pub use download::{DownloadConfig, download};
pub use error::SdlogError;
