//! Command implementations shared by the `camsnap` subcommands.

use crate::errors::AppError;
use camsnap_capture::negotiate::{enumerate, enumerate_sizes};
use camsnap_capture::{
    CancelToken, CaptureConfig, ConfigError, DeviceGuard, DeviceOpener, FrameGeometry,
    NegotiationError, PromptSelector, RunSummary, Selector, decode, encode_jpeg, run_session_with,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.level.clone().into()),
        )
        .with_target(false)
        .init();
}

/// Exit status after a signal arrives before streaming starts.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a shutdown signal does when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// End the process now.
    Exit,
    /// Let the capture loop wind down and release the device.
    Cancel,
}

/// Shutdown state shared with the signal thread.
///
/// Until [`arm`](Self::arm) is called a signal ends the process, so a blocked
/// format prompt cannot hold it up. Once armed a signal only cancels.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    cancel: CancelToken,
    armed: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Route further signals to the cancel token.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn on_signal(&self) -> SignalAction {
        if self.armed.load(Ordering::SeqCst) {
            self.cancel.cancel();
            SignalAction::Cancel
        } else {
            SignalAction::Exit
        }
    }
}

/// Handle SIGINT or SIGTERM through `shutdown`.
///
/// The handler runs on its own thread with a single-threaded runtime.
pub fn install_shutdown_handler(shutdown: Shutdown) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Signal)?;

    thread::Builder::new()
        .name("camsnap-signal".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                match shutdown_signal().await {
                    Ok(name) => match shutdown.on_signal() {
                        SignalAction::Cancel => info!("Received {}, shutting down", name),
                        SignalAction::Exit => {
                            info!("Received {} before streaming, exiting", name);
                            std::process::exit(INTERRUPTED_EXIT_CODE);
                        }
                    },
                    Err(e) => warn!("Signal handler stopped: {}", e),
                }
            })
        })
        .map_err(AppError::Signal)?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl-C")
}

/// Run a capture session, prompting on the terminal unless both choices are
/// configured. `shutdown` is armed once the device is streaming.
pub fn capture<O: DeviceOpener>(
    opener: &O,
    config: &CaptureConfig,
    shutdown: &Shutdown,
) -> Result<RunSummary, AppError> {
    let mut selector: Box<dyn Selector> = match config.fixed_selector() {
        Some(fixed) => Box::new(fixed),
        None => Box::new(PromptSelector::new(io::stdin().lock(), io::stderr())),
    };
    Ok(run_session_with(
        opener,
        config,
        selector.as_mut(),
        shutdown.token(),
        |_| shutdown.arm(),
    )?)
}

/// Print every format and its frame sizes, numbered as the prompt numbers them.
pub fn list<O: DeviceOpener, W: Write>(
    opener: &O,
    path: &Path,
    out: &mut W,
) -> Result<(), AppError> {
    let device = opener.open(path).map_err(|source| AppError::DeviceOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut guard = DeviceGuard::new(device);

    let formats = enumerate(guard.device_mut())?;
    for (i, format) in formats.entries().iter().enumerate() {
        writeln!(out, "[{}] {}", i + 1, format).map_err(AppError::Output)?;
        match enumerate_sizes(guard.device_mut(), format) {
            Ok(sizes) => {
                for (j, size) in sizes.entries().iter().enumerate() {
                    writeln!(out, "    [{}] {}", j + 1, size).map_err(AppError::Output)?;
                }
            }
            Err(NegotiationError::NoFrameSizes(_)) => {
                writeln!(out, "    (no frame sizes)").map_err(AppError::Output)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// A raw dump to turn into a JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Decode a raw packed 4:2:2 dump and write it as a quality 90 JPEG.
///
/// Returns the number of JPEG bytes written.
pub fn convert(job: &ConvertJob) -> Result<usize, AppError> {
    if job.width == 0 || job.height == 0 {
        return Err(ConfigError::InvalidGeometry {
            width: job.width,
            height: job.height,
        }
        .into());
    }

    let raw = fs::read(&job.input).map_err(|source| AppError::Read {
        path: job.input.clone(),
        source,
    })?;
    info!("File had {} bytes", raw.len());

    let image = decode(&raw, &FrameGeometry::new(job.width, job.height))?;
    info!("File has {} 4-byte chunks", raw.len() / 4);
    let jpeg = encode_jpeg(&image)?;

    fs::write(&job.output, &jpeg).map_err(|source| AppError::Write {
        path: job.output.clone(),
        source,
    })?;
    info!("Wrote {} ({} bytes)", job.output.display(), jpeg.len());
    Ok(jpeg.len())
}
