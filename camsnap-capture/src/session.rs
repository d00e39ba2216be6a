//! The capture loop: one device session from open to close.

use crate::cancel::CancelToken;
use crate::catalog::{FrameGeometry, NegotiatedFormat};
use crate::config::CaptureConfig;
use crate::error::SessionError;
use crate::negotiate::{Selector, negotiate_with};
use crate::sink::{CapturedFrame, FrameSink};
use crate::source::{CaptureDevice, DeviceGuard, DeviceOpener};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the loop is in its cycle.
///
/// There is no idle state: a [`CaptureLoop`] only exists once
/// [`CaptureLoop::start`] has opened the device and started streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Streaming,
    WaitingFrame,
    Retrying,
    Decoding,
    Stopped,
}

/// Result of one capture cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame was written to this path.
    Persisted(PathBuf),
    /// The frame was empty or could not be decoded or written.
    Skipped,
    /// Shutdown was requested while waiting.
    Cancelled,
}

/// Owns a streaming device and routes its frames into a sink.
pub struct CaptureLoop<D: CaptureDevice> {
    guard: Option<DeviceGuard<D>>,
    negotiated: NegotiatedFormat,
    geometry: FrameGeometry,
    sink: Box<dyn FrameSink>,
    wait_timeout: Duration,
    max_wait_retries: Option<u32>,
    cancel: CancelToken,
    state: LoopState,
}

impl<D: CaptureDevice> CaptureLoop<D> {
    /// Open the device, negotiate a format and start streaming.
    ///
    /// Every failure here is fatal. The device is closed before returning an
    /// error if it was opened.
    #[tracing::instrument(skip_all, fields(device = %config.device.display()))]
    pub fn start<O, S>(
        opener: &O,
        config: &CaptureConfig,
        selector: &mut S,
        sink: Box<dyn FrameSink>,
        cancel: CancelToken,
    ) -> Result<Self, SessionError>
    where
        O: DeviceOpener<Device = D>,
        S: Selector + ?Sized,
    {
        config.validate()?;

        let device = opener
            .open(&config.device)
            .map_err(|source| SessionError::DeviceOpen {
                path: config.device.clone(),
                source,
            })?;
        let mut guard = DeviceGuard::new(device);
        info!("Opened capture device {}", config.device.display());

        let negotiated = negotiate_with(guard.device_mut(), selector)?;
        guard
            .device_mut()
            .start_streaming()
            .map_err(SessionError::StreamStart)?;
        info!("Streaming started, sink: {}", sink.name());

        Ok(Self {
            guard: Some(guard),
            negotiated,
            geometry: negotiated.geometry(),
            sink,
            wait_timeout: config.wait_timeout,
            max_wait_retries: config.max_wait_retries,
            cancel,
            state: LoopState::Streaming,
        })
    }

    pub fn negotiated(&self) -> NegotiatedFormat {
        self.negotiated
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wait for one frame, retrying timeouts, and persist it.
    ///
    /// Timeouts are retried until a frame arrives, the retry ceiling is hit or
    /// shutdown is requested. Shutdown is checked before every wait attempt
    /// and once more after a frame is ready. Decode and write failures skip
    /// the cycle.
    pub fn capture_cycle(&mut self) -> Result<CycleOutcome, SessionError> {
        let Some(guard) = self.guard.as_mut() else {
            return Ok(CycleOutcome::Cancelled);
        };
        let device = guard.device_mut();

        let mut timeouts = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(CycleOutcome::Cancelled);
            }
            self.state = LoopState::WaitingFrame;
            match device.wait_frame(self.wait_timeout) {
                Ok(()) => break,
                Err(e) if e.is_timeout() => {
                    timeouts += 1;
                    self.state = LoopState::Retrying;
                    warn!("Timeout waiting for frame: {} (attempt {})", e, timeouts);
                    if self.max_wait_retries.is_some_and(|max| timeouts >= max) {
                        return Err(SessionError::FrameWaitExhausted(timeouts));
                    }
                }
                Err(e) => return Err(SessionError::FrameRead(e)),
            }
        }
        if self.cancel.is_cancelled() {
            debug!("Shutdown requested during wait, dropping frame");
            return Ok(CycleOutcome::Cancelled);
        }

        let raw = device.read_frame().map_err(SessionError::FrameRead)?;
        let captured_at = Local::now();
        self.state = LoopState::Decoding;

        let outcome = if raw.is_empty() {
            warn!("Device returned an empty frame, skipping cycle");
            CycleOutcome::Skipped
        } else {
            debug!("Got frame with len {}", raw.len());
            let frame = CapturedFrame {
                raw: &raw,
                geometry: self.geometry,
                captured_at,
            };
            match self.sink.persist(&frame) {
                Ok(path) => CycleOutcome::Persisted(path),
                Err(e) => {
                    warn!(bytes = raw.len(), "Skipping cycle: {}", e);
                    CycleOutcome::Skipped
                }
            }
        };

        self.state = LoopState::Streaming;
        Ok(outcome)
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.guard.take().is_some() {
            info!("Capture device released");
        }
        self.state = LoopState::Stopped;
    }
}
