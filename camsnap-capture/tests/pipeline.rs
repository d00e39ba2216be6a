//! End-to-end capture sessions against scripted fake devices.

use camsnap_capture::testing::{FakeDevice, FakeOpener, Step, init_test_tracing, yuyv_frame};
use camsnap_capture::{
    CancelToken, CaptureConfig, ConfigError, DeviceError, FixedSelector, FrameGeometry, FrameSize,
    SessionError, decode, encode_jpeg, run_session,
};
use chrono::DateTime;
use std::fs;
use std::path::Path;
use std::time::Duration;

const WIDTH: u32 = 16;
const HEIGHT: u32 = 8;

fn config(dir: &Path, overwrite: bool) -> CaptureConfig {
    CaptureConfig {
        output: dir.join("cam.jpg"),
        raw_output: dir.join("frame.yuv"),
        overwrite,
        cadence_secs: 1,
        wait_timeout: Duration::from_millis(5),
        ..Default::default()
    }
}

fn device() -> FakeDevice {
    FakeDevice::yuyv([FrameSize::new(WIDTH, HEIGHT)])
}

#[test]
fn overwrite_keeps_single_file_with_last_frame() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), true);
    let cancel = CancelToken::new();
    let frames: Vec<Vec<u8>> = [40u8, 120, 220]
        .iter()
        .map(|&luma| yuyv_frame(WIDTH, HEIGHT, luma))
        .collect();

    let opener = FakeOpener::new(
        device()
            .script(frames.iter().cloned().map(Step::Frame))
            .cancel_when_done(cancel.clone()),
    );

    let summary = run_session(&opener, &config, &mut FixedSelector::default(), cancel).unwrap();
    assert_eq!(summary.persisted, 3);
    assert!(summary.cancelled);

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let last = decode(&frames[2], &FrameGeometry::new(WIDTH, HEIGHT)).unwrap();
    assert_eq!(fs::read(&config.output).unwrap(), encode_jpeg(&last).unwrap());
    assert_eq!(opener.calls().closes, 1);
}

#[test]
fn timestamped_files_per_cycle() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), false);
    let cancel = CancelToken::new();

    let opener = FakeOpener::new(
        device()
            .script((0..3).map(|i| Step::Frame(yuyv_frame(WIDTH, HEIGHT, 50 + i * 50))))
            .cancel_when_done(cancel.clone()),
    );

    let summary = run_session(&opener, &config, &mut FixedSelector::default(), cancel).unwrap();
    assert_eq!(summary.persisted, 3);
    assert!(!config.output.exists());

    let mut stamps: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .map(|name| {
            let stamp = name.strip_prefix("cam.jpg__").expect("timestamped name");
            DateTime::parse_from_rfc3339(stamp).unwrap()
        })
        .collect();
    assert_eq!(stamps.len(), 3);

    stamps.sort();
    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn zero_cadence_never_opens_device() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        cadence_secs: 0,
        ..config(dir.path(), true)
    };
    let opener = FakeOpener::new(device());

    let err = run_session(
        &opener,
        &config,
        &mut FixedSelector::default(),
        CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Config(ConfigError::InvalidCadence(0))
    ));
    assert!(opener.calls().opens.is_empty());
}

#[test]
fn once_survives_timeouts_and_saves_one_frame() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        once: true,
        ..config(dir.path(), true)
    };
    let opener = FakeOpener::new(device().script([
        Step::Timeout,
        Step::Timeout,
        Step::Timeout,
        Step::Timeout,
        Step::Frame(yuyv_frame(WIDTH, HEIGHT, 100)),
        Step::Frame(yuyv_frame(WIDTH, HEIGHT, 200)),
    ]));

    let summary = run_session(
        &opener,
        &config,
        &mut FixedSelector::default(),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.persisted, 1);
    assert!(!summary.cancelled);

    let calls = opener.calls();
    assert_eq!(calls.waits, 5);
    assert_eq!(calls.reads, 1);
    assert_eq!(calls.closes, 1);
    assert!(config.output.exists());
}

#[test]
fn once_retries_after_skipped_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        once: true,
        ..config(dir.path(), true)
    };
    let opener = FakeOpener::new(device().script([
        Step::Frame(vec![1, 2, 3, 4, 5]),
        Step::Frame(yuyv_frame(WIDTH, HEIGHT, 100)),
    ]));

    let summary = run_session(
        &opener,
        &config,
        &mut FixedSelector::default(),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(summary.cycles, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.persisted, 1);
}

#[test]
fn fatal_read_error_releases_device() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), true);
    let opener = FakeOpener::new(device().script([
        Step::Frame(yuyv_frame(WIDTH, HEIGHT, 100)),
        Step::Fail,
    ]));

    let err = run_session(
        &opener,
        &config,
        &mut FixedSelector::default(),
        CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::FrameRead(DeviceError::Io(_))));
    assert_eq!(opener.calls().closes, 1);
}

#[test]
fn cancel_during_timeouts_releases_device() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), true);
    let cancel = CancelToken::new();
    // An empty script times out forever and cancels on the first wait
    let opener = FakeOpener::new(device().cancel_when_done(cancel.clone()));

    let summary = run_session(&opener, &config, &mut FixedSelector::default(), cancel).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.cycles, 0);
    assert_eq!(opener.calls().closes, 1);
}

#[test]
fn requested_size_follows_sorted_choice() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig {
        once: true,
        ..config(dir.path(), true)
    };
    let opener = FakeOpener::new(
        FakeDevice::yuyv([
            FrameSize::new(640, 480),
            FrameSize::new(160, 120),
            FrameSize::new(320, 240),
        ])
        .applying(FrameSize::new(WIDTH, HEIGHT))
        .script([Step::Frame(yuyv_frame(WIDTH, HEIGHT, 100))]),
    );

    run_session(
        &opener,
        &config,
        &mut FixedSelector::new(1, 2),
        CancelToken::new(),
    )
    .unwrap();

    let calls = opener.calls();
    assert_eq!(calls.set_format.len(), 1);
    assert_eq!((calls.set_format[0].1, calls.set_format[0].2), (320, 240));
}
