//! Capture cadence: single shot or periodic.

use crate::cancel::CancelToken;
use crate::catalog::NegotiatedFormat;
use crate::config::CaptureConfig;
use crate::error::SessionError;
use crate::negotiate::Selector;
use crate::session::{CaptureLoop, CycleOutcome};
use crate::source::{CaptureDevice, DeviceOpener};
use tracing::info;

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub persisted: u64,
    pub skipped: u64,
    pub cancelled: bool,
}

/// Drive `capture` until done.
///
/// With `once`, returns after the first persisted frame. Otherwise sleeps the
/// cadence after every cycle, persisted or skipped, and repeats until
/// cancelled or a fatal error. Cycle time is not subtracted from the sleep.
pub fn run<D: CaptureDevice>(
    capture: &mut CaptureLoop<D>,
    config: &CaptureConfig,
) -> Result<RunSummary, SessionError> {
    let cadence = config.cadence();
    let mut summary = RunSummary::default();

    loop {
        match capture.capture_cycle()? {
            CycleOutcome::Persisted(path) => {
                summary.cycles += 1;
                summary.persisted += 1;
                info!("Saved frame to {}", path.display());
                if config.once {
                    info!("Finished");
                    return Ok(summary);
                }
            }
            CycleOutcome::Skipped => {
                summary.cycles += 1;
                summary.skipped += 1;
            }
            CycleOutcome::Cancelled => {
                summary.cancelled = true;
                return Ok(summary);
            }
        }

        if capture.cancel_token().sleep(cadence) {
            summary.cancelled = true;
            return Ok(summary);
        }
    }
}

/// Validate, open, negotiate, run and release: one whole session.
///
/// The configuration is checked before the device is touched. The device is
/// released on every return path.
pub fn run_session<O, S>(
    opener: &O,
    config: &CaptureConfig,
    selector: &mut S,
    cancel: CancelToken,
) -> Result<RunSummary, SessionError>
where
    O: DeviceOpener,
    S: Selector + ?Sized,
{
    run_session_with(opener, config, selector, cancel, |_| {})
}

/// [`run_session`] with a hook called once the device is streaming, before
/// the first cycle. It is not called if the session fails to start.
pub fn run_session_with<O, S, F>(
    opener: &O,
    config: &CaptureConfig,
    selector: &mut S,
    cancel: CancelToken,
    on_streaming: F,
) -> Result<RunSummary, SessionError>
where
    O: DeviceOpener,
    S: Selector + ?Sized,
    F: FnOnce(&NegotiatedFormat),
{
    config.validate()?;
    info!(
        "Starting with cam: {}, file: {}, overwrite: {}, upsec: {}, once: {}",
        config.device.display(),
        config.output_policy().base.display(),
        config.overwrite,
        config.cadence_secs,
        config.once
    );

    let mut capture = CaptureLoop::start(opener, config, selector, config.build_sink(), cancel)?;
    on_streaming(&capture.negotiated());
    let result = run(&mut capture, config);
    capture.stop();

    if let Ok(summary) = &result {
        info!(
            "Session ended after {} cycles ({} saved, {} skipped{})",
            summary.cycles,
            summary.persisted,
            summary.skipped,
            if summary.cancelled { ", cancelled" } else { "" }
        );
    }
    result
}
