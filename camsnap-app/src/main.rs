//! camsnap
//!
//! Periodic still capture from a video device.
//!
//! Commands:
//! - `capture` (default): negotiate a format and save frames on a cadence
//! - `list`: print the formats and frame sizes a device offers
//! - `convert`: turn a raw packed 4:2:2 dump into a JPEG

mod app;
mod errors;

use app::{ConvertJob, LoggingConfig};
use camsnap_capture::config::{
    DEFAULT_CADENCE_SECS, DEFAULT_DEVICE, DEFAULT_OUTPUT, DEFAULT_RAW_OUTPUT,
};
use camsnap_capture::{CaptureConfig, SinkKind};
use clap::{Args as ClapArgs, Parser, Subcommand};
use errors::AppError;
use std::path::PathBuf;
use std::time::Duration;

/// camsnap - scheduled still capture from a webcam
#[derive(Parser, Debug)]
#[command(name = "camsnap")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    capture: CaptureArgs,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save frames from the device on a cadence
    Capture(CaptureArgs),
    /// List the formats and frame sizes a device offers
    List {
        /// Video device node
        #[arg(long = "device", visible_alias = "cam", default_value = DEFAULT_DEVICE)]
        device: PathBuf,
    },
    /// Convert a raw frame dump to JPEG
    Convert(ConvertArgs),
}

#[derive(ClapArgs, Debug, Clone)]
struct CaptureArgs {
    /// Video device node
    #[arg(long, default_value = DEFAULT_DEVICE)]
    cam: PathBuf,

    /// JPEG output file, or base name for timestamped files
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    file: PathBuf,

    /// Stop after the first saved frame
    #[arg(long)]
    once: bool,

    /// Overwrite the output file instead of appending a timestamp
    #[arg(long)]
    overwrite: bool,

    /// Seconds between captures
    #[arg(long, default_value_t = DEFAULT_CADENCE_SECS)]
    upsec: u64,

    /// Dump raw device buffers instead of JPEG
    #[arg(long)]
    raw: bool,

    /// Raw dump output file
    #[arg(long, default_value = DEFAULT_RAW_OUTPUT)]
    raw_file: PathBuf,

    /// 1-based format choice, skips the prompt together with --size
    #[arg(long, requires = "size")]
    format: Option<usize>,

    /// 1-based frame size choice, skips the prompt together with --format
    #[arg(long, requires = "format")]
    size: Option<usize>,

    /// Give up after this many consecutive frame wait timeouts
    #[arg(long)]
    max_retries: Option<u32>,

    /// Seconds to wait for each frame before retrying
    #[arg(long, default_value_t = 3)]
    wait_secs: u64,
}

impl CaptureArgs {
    fn into_config(self) -> CaptureConfig {
        CaptureConfig {
            device: self.cam,
            output: self.file,
            raw_output: self.raw_file,
            sink: if self.raw {
                SinkKind::RawDump
            } else {
                SinkKind::Jpeg
            },
            overwrite: self.overwrite,
            once: self.once,
            cadence_secs: self.upsec,
            wait_timeout: Duration::from_secs(self.wait_secs),
            max_wait_retries: self.max_retries,
            format_choice: self.format,
            size_choice: self.size,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct ConvertArgs {
    /// Raw packed 4:2:2 dump
    #[arg(long, default_value = DEFAULT_RAW_OUTPUT)]
    input: PathBuf,

    /// JPEG file to write
    #[arg(long, default_value = "./output.jpeg")]
    output: PathBuf,

    /// Frame width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,
}

impl From<ConvertArgs> for ConvertJob {
    fn from(args: ConvertArgs) -> Self {
        ConvertJob {
            input: args.input,
            output: args.output,
            width: args.width,
            height: args.height,
        }
    }
}

fn run_capture(config: CaptureConfig) -> Result<(), AppError> {
    config.validate()?;

    #[cfg(feature = "v4l2")]
    {
        let shutdown = app::Shutdown::new();
        app::install_shutdown_handler(shutdown.clone())?;
        app::capture(&camsnap_capture::V4l2Opener::new(), &config, &shutdown)?;
        Ok(())
    }
    #[cfg(not(feature = "v4l2"))]
    {
        Err(AppError::NoCaptureBackend)
    }
}

fn run_list(device: PathBuf) -> Result<(), AppError> {
    #[cfg(feature = "v4l2")]
    {
        let stdout = std::io::stdout();
        app::list(
            &camsnap_capture::V4l2Opener::new(),
            &device,
            &mut stdout.lock(),
        )
    }
    #[cfg(not(feature = "v4l2"))]
    {
        let _ = device;
        Err(AppError::NoCaptureBackend)
    }
}

fn run(args: Args) -> Result<(), AppError> {
    match args.command {
        None => run_capture(args.capture.into_config()),
        Some(Command::Capture(capture)) => run_capture(capture.into_config()),
        Some(Command::List { device }) => run_list(device),
        Some(Command::Convert(convert)) => app::convert(&convert.into()).map(|_| ()),
    }
}

fn main() {
    let args = Args::parse();
    app::init_logging(&LoggingConfig {
        level: args.log_level.clone(),
    });

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
