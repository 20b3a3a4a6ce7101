use crate::constants::{DEFAULT_FIRST_DATA_SECTOR, DEFAULT_VALUES_PER_SAMPLE, SECTOR_SIZE};
use crate::device::DataLogger;
use crate::error::SdlogError;
use crate::ready::ReadySignal;
use crate::sample::decode_sector;
use crate::sink::RecordSink;
use crate::transport::Transport;
use tracing::info;

/// Parameters for one download run. Every knob is explicit; nothing is
/// read from ambient state.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Total samples to export.
    pub target_samples: u32,
    /// Sector index where the data region starts.
    pub first_data_sector: u32,
    /// 16-bit values per sample; the fixed channel schema requires 16.
    pub values_per_sample: u16,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            target_samples: 3600,
            first_data_sector: DEFAULT_FIRST_DATA_SECTOR,
            values_per_sample: DEFAULT_VALUES_PER_SAMPLE,
        }
    }
}

impl DownloadConfig {
    /// Samples carried by one sector at the configured width.
    pub fn samples_per_sector(&self) -> u32 {
        SECTOR_SIZE as u32 / (u32::from(self.values_per_sample) * 2)
    }

    /// Sectors needed to cover the target, rounded up.
    pub fn total_sectors(&self) -> u32 {
        self.target_samples.div_ceil(self.samples_per_sector())
    }

    fn validate(&self) -> Result<(), SdlogError> {
        if self.values_per_sample != DEFAULT_VALUES_PER_SAMPLE {
            return Err(SdlogError::Configuration(format!(
                "values_per_sample must be {DEFAULT_VALUES_PER_SAMPLE} for the fixed channel schema, got {}",
                self.values_per_sample
            )));
        }
        if self.target_samples == 0 {
            return Err(SdlogError::Configuration(
                "target_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Live state of a download, advanced after each validated sector.
#[derive(Debug)]
pub struct DownloadSession {
    pub target_samples: u32,
    pub samples_written: u32,
    pub current_sector: u32,
    pub first_data_sector: u32,
}

impl DownloadSession {
    fn new(config: &DownloadConfig) -> Self {
        Self {
            target_samples: config.target_samples,
            samples_written: 0,
            current_sector: config.first_data_sector,
            first_data_sector: config.first_data_sector,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.samples_written >= self.target_samples
    }
}

/// Stream `config.target_samples` decoded samples into `sink`.
///
/// Sector fetches retry internally until each sector validates, so every
/// record appended has passed the checksum — a download never completes
/// with corrupted data folded in. Stops mid-sector once the target is
/// reached, discarding the remainder. Returns the number of samples
/// written.
pub async fn download<T, R, S>(
    device: &mut DataLogger<T, R>,
    config: &DownloadConfig,
    sink: &mut S,
) -> Result<u32, SdlogError>
where
    T: Transport,
    R: ReadySignal,
    S: RecordSink,
{
    config.validate()?;

    let total_sectors = config.total_sectors();
    let progress_interval = (total_sectors / 99).max(1);
    info!(
        target_samples = config.target_samples,
        total_sectors,
        first_data_sector = config.first_data_sector,
        "starting download"
    );

    let mut session = DownloadSession::new(config);
    for sector_offset in 0..total_sectors {
        if sector_offset % progress_interval == 0 || sector_offset == total_sectors - 1 {
            let percent = f64::from(sector_offset + 1) / f64::from(total_sectors) * 100.0;
            info!("progress: {:.0}%", percent);
        }

        session.current_sector = config.first_data_sector + sector_offset;
        let payload = device.fetch_sector(session.current_sector).await?;
        let samples = decode_sector(&payload, config.values_per_sample)?;

        for sample in samples {
            if session.is_complete() {
                break;
            }
            sink.append(&sample)?;
            session.samples_written += 1;
        }

        if session.is_complete() {
            break;
        }
    }

    sink.flush()?;
    info!(samples_written = session.samples_written, "download complete");
    Ok(session.samples_written)
}
