//! Scripted fake devices and shared helpers for capture tests.
//!
//! Available behind the `test-util` feature or in `#[cfg(test)]` within
//! camsnap-capture.
//!
//! A [`FakeDevice`] replays a script of wait outcomes and records every call
//! into a shared [`Calls`] log that stays readable after the device has been
//! moved into a session.

use crate::cancel::CancelToken;
use crate::catalog::{FourCc, FrameSize, NegotiatedFormat, PixelFormat};
use crate::error::DeviceError;
use crate::source::{CaptureDevice, DeviceOpener};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Initialise a tracing subscriber for tests.
///
/// Respects `RUST_LOG`, defaults to `debug`. Safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A packed 4:2:2 frame of uniform luma with neutral chroma.
pub fn yuyv_frame(width: u32, height: u32, luma: u8) -> Vec<u8> {
    [luma, 128, luma, 128].repeat((width as usize * height as usize) / 2)
}

/// One scripted response to `wait_frame`.
#[derive(Debug, Clone)]
pub enum Step {
    Timeout,
    Frame(Vec<u8>),
    /// A ready buffer with no bytes in it.
    Empty,
    /// A non-timeout device failure.
    Fail,
    /// A ready frame, with `token` cancelled while the wait was in progress.
    FrameAndCancel(Vec<u8>, CancelToken),
}

/// Everything the fake saw.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub opens: Vec<PathBuf>,
    pub set_format: Vec<(FourCc, u32, u32)>,
    pub streams_started: usize,
    pub waits: usize,
    pub reads: usize,
    pub closes: usize,
}

/// Shared view of a fake's call log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Calls>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Calls> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Calls {
        self.lock().clone()
    }
}

/// In-memory capture device.
#[derive(Debug)]
pub struct FakeDevice {
    formats: Vec<PixelFormat>,
    sizes: Vec<FrameSize>,
    applied: Option<FrameSize>,
    script: VecDeque<Step>,
    pending: Option<Vec<u8>>,
    streaming: bool,
    refuse_stream: bool,
    cancel_when_done: Option<CancelToken>,
    log: CallLog,
}

impl FakeDevice {
    /// A device offering only formats, with no frame sizes.
    pub fn with_formats(formats: Vec<PixelFormat>) -> Self {
        Self {
            formats,
            sizes: Vec::new(),
            applied: None,
            script: VecDeque::new(),
            pending: None,
            streaming: false,
            refuse_stream: false,
            cancel_when_done: None,
            log: CallLog::default(),
        }
    }

    /// A single YUYV format offering `sizes` in the given order.
    pub fn yuyv(sizes: impl IntoIterator<Item = FrameSize>) -> Self {
        let mut device = Self::with_formats(vec![PixelFormat::new(FourCc::YUYV, "YUYV 4:2:2")]);
        device.sizes = sizes.into_iter().collect();
        device
    }

    /// Apply `size` regardless of what is requested.
    pub fn applying(mut self, size: FrameSize) -> Self {
        self.applied = Some(size);
        self
    }

    /// Wait outcomes replayed in order.
    pub fn script(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script.extend(steps);
        self
    }

    /// Cancel `token` once the last scripted frame has been read.
    pub fn cancel_when_done(mut self, token: CancelToken) -> Self {
        self.cancel_when_done = Some(token);
        self
    }

    /// Fail `start_streaming`.
    pub fn refusing_stream(mut self) -> Self {
        self.refuse_stream = true;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn calls(&self) -> Calls {
        self.log.snapshot()
    }

    fn finish_if_exhausted(&self) {
        if self.script.is_empty() {
            if let Some(token) = &self.cancel_when_done {
                token.cancel();
            }
        }
    }
}

impl CaptureDevice for FakeDevice {
    fn formats(&mut self) -> Result<Vec<PixelFormat>, DeviceError> {
        Ok(self.formats.clone())
    }

    fn frame_sizes(&mut self, format: FourCc) -> Result<Vec<FrameSize>, DeviceError> {
        if self.formats.iter().any(|f| f.fourcc == format) {
            Ok(self.sizes.clone())
        } else {
            Err(DeviceError::Rejected(format!("unknown format {}", format)))
        }
    }

    fn set_format(
        &mut self,
        format: FourCc,
        width: u32,
        height: u32,
    ) -> Result<NegotiatedFormat, DeviceError> {
        self.log.lock().set_format.push((format, width, height));
        let size = self.applied.unwrap_or(FrameSize::new(width, height));
        Ok(NegotiatedFormat {
            fourcc: format,
            width: size.width,
            height: size.height,
        })
    }

    fn start_streaming(&mut self) -> Result<(), DeviceError> {
        self.log.lock().streams_started += 1;
        if self.refuse_stream {
            return Err(DeviceError::Rejected("VIDIOC_STREAMON".to_string()));
        }
        self.streaming = true;
        Ok(())
    }

    fn wait_frame(&mut self, timeout: Duration) -> Result<(), DeviceError> {
        self.log.lock().waits += 1;
        if !self.streaming {
            return Err(DeviceError::NotStreaming);
        }
        match self.script.pop_front() {
            Some(Step::Frame(bytes)) => {
                self.pending = Some(bytes);
                Ok(())
            }
            Some(Step::Empty) => {
                self.pending = Some(Vec::new());
                Ok(())
            }
            Some(Step::FrameAndCancel(bytes, token)) => {
                token.cancel();
                self.pending = Some(bytes);
                Ok(())
            }
            Some(Step::Fail) => Err(DeviceError::Io(std::io::Error::other("device unplugged"))),
            Some(Step::Timeout) => Err(DeviceError::Timeout(timeout)),
            None => {
                self.finish_if_exhausted();
                Err(DeviceError::Timeout(timeout))
            }
        }
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.log.lock().reads += 1;
        let frame = self.pending.take().ok_or(DeviceError::NotStreaming)?;
        self.finish_if_exhausted();
        Ok(frame)
    }

    fn close(&mut self) {
        self.streaming = false;
        self.log.lock().closes += 1;
    }
}

/// Hands out one prepared [`FakeDevice`].
#[derive(Debug)]
pub struct FakeOpener {
    device: Mutex<Option<FakeDevice>>,
    log: CallLog,
}

impl FakeOpener {
    pub fn new(device: FakeDevice) -> Self {
        let log = device.log();
        Self {
            device: Mutex::new(Some(device)),
            log,
        }
    }

    /// An opener whose every open fails.
    pub fn missing() -> Self {
        Self {
            device: Mutex::new(None),
            log: CallLog::default(),
        }
    }

    pub fn calls(&self) -> Calls {
        self.log.snapshot()
    }
}

impl DeviceOpener for FakeOpener {
    type Device = FakeDevice;

    fn open(&self, path: &Path) -> Result<FakeDevice, DeviceError> {
        self.log.lock().opens.push(path.to_path_buf());
        self.device
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| DeviceError::NotFound(path.display().to_string()))
    }
}
