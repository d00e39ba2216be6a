//! camsnap capture - scheduled still capture from video devices
//!
//! The pipeline negotiates a pixel format with a device, waits for packed
//! 4:2:2 frames, splits them into luma and chroma planes and persists each one
//! through a [`FrameSink`]:
//!
//! - [`catalog`]: device capability values and frame geometry
//! - [`negotiate`]: format/size selection and the interactive prompt
//! - [`decode`]: packed `[Y0, U, Y1, V]` to planar conversion
//! - [`sink`]: JPEG and raw dump persistence
//! - [`session`]: the capture loop owning the device
//! - [`schedule`]: single-shot and periodic cadence
//!
//! Linux devices are supported through Video4Linux2 with the `v4l2` feature.
//!
//! ## Example
//!
//! ```ignore
//! use camsnap_capture::{CancelToken, CaptureConfig, FixedSelector, V4l2Opener, run_session};
//!
//! let config = CaptureConfig { once: true, ..Default::default() };
//! let summary = run_session(&V4l2Opener::new(), &config, &mut FixedSelector::default(), CancelToken::new())?;
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod error;
pub mod negotiate;
pub mod schedule;
pub mod session;
pub mod sink;
mod source;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

#[cfg(feature = "v4l2")]
mod v4l2;

pub use cancel::CancelToken;
pub use catalog::{
    FormatCatalog, FourCc, FrameGeometry, FrameSize, NegotiatedFormat, PixelFormat, SizeCatalog,
};
pub use config::{CaptureConfig, SinkKind};
pub use decode::{DecodedImage, decode};
pub use error::{ConfigError, DecodeError, DeviceError, NegotiationError, SessionError, SinkError};
pub use negotiate::{FixedSelector, PromptSelector, Selector};
pub use schedule::{RunSummary, run, run_session, run_session_with};
pub use session::{CaptureLoop, CycleOutcome, LoopState};
pub use sink::{FrameSink, JpegSink, OutputPolicy, RawDumpSink, encode_jpeg};
pub use source::{CaptureDevice, DeviceGuard, DeviceOpener};

#[cfg(feature = "v4l2")]
pub use v4l2::{V4l2Device, V4l2Opener};
