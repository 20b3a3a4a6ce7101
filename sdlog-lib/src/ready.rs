use crate::error::SdlogError;
use async_trait::async_trait;
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Source of the out-of-band "response available" indication.
#[async_trait]
pub trait ReadySignal: Send {
    /// Block until the device reports ready or `cancel` fires.
    ///
    /// There is no built-in timeout; cancellation is the only way out of an
    /// unbounded wait.
    async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<(), SdlogError>;
}

#[async_trait]
impl ReadySignal for Box<dyn ReadySignal> {
    async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<(), SdlogError> {
        self.as_mut().wait_ready(cancel).await
    }
}

/// Data-ready line exposed through the GPIO character device.
pub struct GpioReady {
    line: LineHandle,
    poll_interval: Duration,
}

impl GpioReady {
    pub fn open(
        chip_path: &Path,
        line_offset: u32,
        poll_interval: Duration,
    ) -> Result<Self, SdlogError> {
        let mut chip = Chip::new(chip_path)?;
        let line = chip.get_line(line_offset)?;
        let handle = line.request(LineRequestFlags::INPUT, 0, "sdlog-data-ready")?;
        Ok(Self {
            line: handle,
            poll_interval,
        })
    }

    /// Current level of the data-ready line.
    pub fn level(&self) -> Result<bool, SdlogError> {
        Ok(self.line.get_value()? != 0)
    }
}

#[async_trait]
impl ReadySignal for GpioReady {
    async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<(), SdlogError> {
        loop {
            if cancel.is_cancelled() {
                return Err(SdlogError::Cancelled);
            }
            if self.level()? {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// Fixed settle delay standing in for a real readiness line.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ReadySignal for FixedDelay {
    async fn wait_ready(&mut self, cancel: &CancellationToken) -> Result<(), SdlogError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(SdlogError::Cancelled),
            _ = sleep(self.delay) => Ok(()),
        }
    }
}
