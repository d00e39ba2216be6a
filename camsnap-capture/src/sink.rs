//! Frame persistence.
//!
//! Both sinks share one [`OutputPolicy`]: a single overwritten file, or one
//! timestamped file per cycle.

use crate::catalog::FrameGeometry;
use crate::decode::{DecodedImage, decode};
use crate::error::SinkError;
use chrono::{DateTime, Local, SecondsFormat};
use image::codecs::jpeg::JpegEncoder;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JPEG quality used for persisted frames.
pub const JPEG_QUALITY: u8 = 90;

/// Separator between the base path and the cycle timestamp.
pub const TIMESTAMP_SEPARATOR: &str = "__";

/// A frame handed to a sink.
#[derive(Debug, Clone, Copy)]
pub struct CapturedFrame<'a> {
    pub raw: &'a [u8],
    pub geometry: FrameGeometry,
    pub captured_at: DateTime<Local>,
}

/// Persists frames. Implementations decide whether to decode.
pub trait FrameSink {
    /// Persist one frame, returning the path written.
    fn persist(&mut self, frame: &CapturedFrame<'_>) -> Result<PathBuf, SinkError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Where each cycle's file goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPolicy {
    pub base: PathBuf,
    pub overwrite: bool,
}

impl OutputPolicy {
    pub fn new(base: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            base: base.into(),
            overwrite,
        }
    }

    /// `base` when overwriting, otherwise `base__<RFC3339>`.
    pub fn resolve(&self, at: &DateTime<Local>) -> PathBuf {
        if self.overwrite {
            return self.base.clone();
        }
        let mut name = OsString::from(self.base.as_os_str());
        name.push(TIMESTAMP_SEPARATOR);
        name.push(at.to_rfc3339_opts(SecondsFormat::Secs, true));
        PathBuf::from(name)
    }
}

/// Encode a decoded frame as a baseline JPEG.
pub fn encode_jpeg(image: &DecodedImage) -> Result<Vec<u8>, SinkError> {
    let rgb = image.to_rgb()?;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SinkError> {
    fs::write(path, bytes).map_err(|source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes each frame and writes it as a JPEG.
#[derive(Debug, Clone)]
pub struct JpegSink {
    policy: OutputPolicy,
}

impl JpegSink {
    pub fn new(policy: OutputPolicy) -> Self {
        Self { policy }
    }
}

impl FrameSink for JpegSink {
    fn persist(&mut self, frame: &CapturedFrame<'_>) -> Result<PathBuf, SinkError> {
        let image = decode(frame.raw, &frame.geometry)?;
        let jpeg = encode_jpeg(&image)?;
        let path = self.policy.resolve(&frame.captured_at);
        write_file(&path, &jpeg)?;
        debug!("Wrote {} byte JPEG to {}", jpeg.len(), path.display());
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "jpeg"
    }
}

/// Writes the undecoded device buffer for offline inspection.
#[derive(Debug, Clone)]
pub struct RawDumpSink {
    policy: OutputPolicy,
}

impl RawDumpSink {
    pub fn new(policy: OutputPolicy) -> Self {
        Self { policy }
    }
}

impl FrameSink for RawDumpSink {
    fn persist(&mut self, frame: &CapturedFrame<'_>) -> Result<PathBuf, SinkError> {
        let path = self.policy.resolve(&frame.captured_at);
        write_file(&path, frame.raw)?;
        debug!("Dumped {} raw bytes to {}", frame.raw.len(), path.display());
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(secs, 0).unwrap()
    }

    fn gray_frame(width: u32, height: u32, luma: u8) -> Vec<u8> {
        [luma, 128, luma, 128].repeat((width * height / 2) as usize)
    }

    #[test]
    fn test_policy_overwrite_uses_base() {
        let policy = OutputPolicy::new("cam.jpg", true);
        assert_eq!(policy.resolve(&at(0)), PathBuf::from("cam.jpg"));
        assert_eq!(policy.resolve(&at(100)), PathBuf::from("cam.jpg"));
    }

    #[test]
    fn test_policy_timestamped_name() {
        let policy = OutputPolicy::new("out/cam.jpg", false);
        let when = at(1_700_000_000);
        let resolved = policy.resolve(&when);
        let expected = format!(
            "out/cam.jpg__{}",
            when.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        assert_eq!(resolved, PathBuf::from(expected));

        let stamp = resolved
            .to_str()
            .unwrap()
            .rsplit(TIMESTAMP_SEPARATOR)
            .next()
            .unwrap();
        assert_eq!(DateTime::parse_from_rfc3339(stamp).unwrap(), when);
    }

    #[test]
    fn test_jpeg_sink_writes_decodable_image() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("cam.jpg");
        let mut sink = JpegSink::new(OutputPolicy::new(&base, true));

        let raw = gray_frame(16, 8, 90);
        let frame = CapturedFrame {
            raw: &raw,
            geometry: FrameGeometry::new(16, 8),
            captured_at: at(0),
        };
        let written = sink.persist(&frame).unwrap();
        assert_eq!(written, base);

        let bytes = fs::read(&base).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_jpeg_sink_rejects_bad_length() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("cam.jpg");
        let mut sink = JpegSink::new(OutputPolicy::new(&base, true));

        let raw = vec![0u8; 5];
        let frame = CapturedFrame {
            raw: &raw,
            geometry: FrameGeometry::new(2, 1),
            captured_at: at(0),
        };
        assert!(matches!(sink.persist(&frame), Err(SinkError::Decode(_))));
        assert!(!base.exists());
    }

    #[test]
    fn test_raw_sink_writes_bytes_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("frame.yuv");
        let mut sink = RawDumpSink::new(OutputPolicy::new(&base, true));

        // Not a whole macropixel: raw dumps never decode
        let raw = vec![1u8, 2, 3, 4, 5];
        let frame = CapturedFrame {
            raw: &raw,
            geometry: FrameGeometry::new(2, 1),
            captured_at: at(0),
        };
        sink.persist(&frame).unwrap();
        assert_eq!(fs::read(&base).unwrap(), raw);
    }

    #[test]
    fn test_write_failure_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("missing").join("frame.yuv");
        let mut sink = RawDumpSink::new(OutputPolicy::new(&base, true));

        let raw = vec![0u8; 4];
        let frame = CapturedFrame {
            raw: &raw,
            geometry: FrameGeometry::new(2, 1),
            captured_at: at(0),
        };
        match sink.persist(&frame) {
            Err(SinkError::Write { path, .. }) => assert_eq!(path, base),
            other => panic!("expected write error, got {:?}", other),
        }
    }
}
