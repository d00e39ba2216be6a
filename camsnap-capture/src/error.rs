//! Error types for the capture pipeline.
//!
//! Errors are split by severity: [`SessionError`] ends a capture session,
//! while [`DecodeError`] and [`SinkError`] only skip the current cycle.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`CaptureDevice`](crate::CaptureDevice) implementation.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Timed out after {0:?} waiting for frame")]
    Timeout(Duration),

    #[error("Device rejected request: {0}")]
    Rejected(String),

    #[error("Device is not streaming")]
    NotStreaming,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Whether this error is a per-attempt wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeviceError::Timeout(_))
    }
}

/// Errors raised while choosing and applying a capture format.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("Device reported no pixel formats")]
    NoFormats,

    #[error("Device reported no frame sizes for format {0}")]
    NoFrameSizes(String),

    #[error("{what} choice {choice} is out of range [1-{len}]")]
    SelectionOutOfRange {
        what: &'static str,
        choice: usize,
        len: usize,
    },

    #[error("Selection input closed before a choice was made")]
    InputClosed,

    #[error("Selection prompt IO error: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Errors turning raw bytes into an image. These skip a cycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Frame length {0} is not divisible by 4")]
    InvalidFrameLength(usize),

    #[error("Frame planes hold {actual} luma bytes but geometry needs {expected}")]
    GeometryMismatch { expected: usize, actual: usize },
}

/// Errors persisting a frame. These skip a cycle.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("JPEG encoding error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Rejected configuration, detected before any device access.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid cadence {0}s: must be > 0")]
    InvalidCadence(u64),

    #[error("Invalid frame wait timeout: must be > 0")]
    InvalidWaitTimeout,

    #[error("Invalid geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
}

/// Session-terminating errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open device {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: DeviceError,
    },

    #[error("Format negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Failed to start streaming: {0}")]
    StreamStart(#[source] DeviceError),

    #[error("Failed to read frame: {0}")]
    FrameRead(#[source] DeviceError),

    #[error("Gave up after {0} consecutive frame wait timeouts")]
    FrameWaitExhausted(u32),
}
