//! Capture session configuration.

use crate::error::ConfigError;
use crate::negotiate::FixedSelector;
use crate::sink::{FrameSink, JpegSink, OutputPolicy, RawDumpSink};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEVICE: &str = "/dev/video0";
pub const DEFAULT_OUTPUT: &str = "./camera_frame.jpeg";
pub const DEFAULT_RAW_OUTPUT: &str = "./frame.yuv";
pub const DEFAULT_CADENCE_SECS: u64 = 10;
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Which sink persists frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkKind {
    /// Decode and write a JPEG.
    #[default]
    Jpeg,
    /// Write the raw device buffer.
    RawDump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub device: PathBuf,
    /// JPEG output path (base name when not overwriting).
    pub output: PathBuf,
    /// Raw dump path used by [`SinkKind::RawDump`].
    pub raw_output: PathBuf,
    pub sink: SinkKind,
    pub overwrite: bool,
    pub once: bool,
    /// Seconds between cycles. Must be > 0.
    pub cadence_secs: u64,
    /// Per-attempt frame wait timeout.
    pub wait_timeout: Duration,
    /// Consecutive wait timeouts tolerated before giving up. `None` retries forever.
    pub max_wait_retries: Option<u32>,
    /// 1-based format choice; `None` means ask.
    pub format_choice: Option<usize>,
    /// 1-based frame size choice; `None` means ask.
    pub size_choice: Option<usize>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            output: PathBuf::from(DEFAULT_OUTPUT),
            raw_output: PathBuf::from(DEFAULT_RAW_OUTPUT),
            sink: SinkKind::Jpeg,
            overwrite: false,
            once: false,
            cadence_secs: DEFAULT_CADENCE_SECS,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            max_wait_retries: None,
            format_choice: None,
            size_choice: None,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cadence_secs == 0 {
            return Err(ConfigError::InvalidCadence(self.cadence_secs));
        }
        if self.wait_timeout.is_zero() {
            return Err(ConfigError::InvalidWaitTimeout);
        }
        Ok(())
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }

    /// Output policy for the configured sink.
    pub fn output_policy(&self) -> OutputPolicy {
        let base = match self.sink {
            SinkKind::Jpeg => &self.output,
            SinkKind::RawDump => &self.raw_output,
        };
        OutputPolicy::new(base.clone(), self.overwrite)
    }

    pub fn build_sink(&self) -> Box<dyn FrameSink> {
        let policy = self.output_policy();
        match self.sink {
            SinkKind::Jpeg => Box::new(JpegSink::new(policy)),
            SinkKind::RawDump => Box::new(RawDumpSink::new(policy)),
        }
    }

    /// Selector for configured choices, if both are set.
    pub fn fixed_selector(&self) -> Option<FixedSelector> {
        match (self.format_choice, self.size_choice) {
            (Some(format), Some(size)) => Some(FixedSelector::new(format, size)),
            _ => None,
        }
    }
}
