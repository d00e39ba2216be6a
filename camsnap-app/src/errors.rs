//! Error types for the command line application.

use camsnap_capture::{ConfigError, DecodeError, DeviceError, NegotiationError, SessionError, SinkError};
use std::path::PathBuf;
use thiserror::Error;

/// Anything that ends a command with a non-zero exit status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Failed to open {path}: {source}")]
    DeviceOpen { path: PathBuf, source: DeviceError },

    #[error("{0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Failed reading file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed writing file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid raw frame: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encoding failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Failed to install signal handler: {0}")]
    Signal(std::io::Error),

    #[error("Output error: {0}")]
    Output(std::io::Error),

    #[error("Built without Video4Linux2 support")]
    NoCaptureBackend,
}
