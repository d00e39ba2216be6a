//! Video4Linux2 capture using the `v4l` crate and mmap streaming.

use crate::catalog::{FourCc, FrameSize, NegotiatedFormat, PixelFormat};
use crate::error::DeviceError;
use crate::source::{CaptureDevice, DeviceOpener};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Default number of mmap buffers.
pub const BUFFER_COUNT: u32 = 4;

/// Opens `/dev/video*` nodes.
#[derive(Debug, Clone, Copy)]
pub struct V4l2Opener {
    buffer_count: u32,
}

impl V4l2Opener {
    pub fn new() -> Self {
        Self {
            buffer_count: BUFFER_COUNT,
        }
    }

    pub fn with_buffers(buffer_count: u32) -> Self {
        Self { buffer_count }
    }
}

impl Default for V4l2Opener {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceOpener for V4l2Opener {
    type Device = V4l2Device;

    fn open(&self, path: &Path) -> Result<V4l2Device, DeviceError> {
        let device = Device::with_path(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DeviceError::NotFound(path.display().to_string()),
            _ => DeviceError::Io(e),
        })?;
        Ok(V4l2Device {
            device: Some(device),
            stream: None,
            pending: None,
            buffer_count: self.buffer_count,
        })
    }
}

/// An open V4L2 capture node.
pub struct V4l2Device {
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    pending: Option<Vec<u8>>,
    buffer_count: u32,
}

impl V4l2Device {
    fn handle(&self) -> Result<&Device, DeviceError> {
        self.device
            .as_ref()
            .ok_or_else(|| DeviceError::Rejected("device closed".to_string()))
    }

    fn arm_stream(&mut self) -> Result<(), DeviceError> {
        // Old buffers must be unmapped before new ones are requested.
        self.stream = None;
        let stream = MmapStream::with_buffers(self.handle()?, Type::VideoCapture, self.buffer_count)?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl CaptureDevice for V4l2Device {
    fn formats(&mut self) -> Result<Vec<PixelFormat>, DeviceError> {
        Ok(self
            .handle()?
            .enum_formats()?
            .into_iter()
            .map(|desc| PixelFormat::new(FourCc(desc.fourcc.repr), desc.description))
            .collect())
    }

    fn frame_sizes(&mut self, format: FourCc) -> Result<Vec<FrameSize>, DeviceError> {
        Ok(self
            .handle()?
            .enum_framesizes(FourCC::new(&format.0))?
            .into_iter()
            .map(|size| match size.size {
                FrameSizeEnum::Discrete(d) => FrameSize::new(d.width, d.height),
                FrameSizeEnum::Stepwise(s) => FrameSize::new(s.max_width, s.max_height),
            })
            .collect())
    }

    fn set_format(
        &mut self,
        format: FourCc,
        width: u32,
        height: u32,
    ) -> Result<NegotiatedFormat, DeviceError> {
        let requested = Format::new(width, height, FourCC::new(&format.0));
        let applied = self.handle()?.set_format(&requested)?;
        debug!("VIDIOC_S_FMT applied {}", applied);
        Ok(NegotiatedFormat {
            fourcc: FourCc(applied.fourcc.repr),
            width: applied.width,
            height: applied.height,
        })
    }

    fn start_streaming(&mut self) -> Result<(), DeviceError> {
        self.arm_stream()?;
        info!("Mapped {} capture buffers", self.buffer_count);
        Ok(())
    }

    fn wait_frame(&mut self, timeout: Duration) -> Result<(), DeviceError> {
        let stream = self.stream.as_mut().ok_or(DeviceError::NotStreaming)?;
        stream.set_timeout(timeout);
        let frame = stream.next().map(|(buf, meta)| {
            let used = (meta.bytesused as usize).min(buf.len());
            buf[..used].to_vec()
        });

        match frame {
            Ok(bytes) => {
                self.pending = Some(bytes);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                // A timed-out dequeue leaves the queue half re-armed.
                self.arm_stream()?;
                Err(DeviceError::Timeout(timeout))
            }
            Err(e) => Err(DeviceError::Io(e)),
        }
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.pending.take().ok_or(DeviceError::NotStreaming)
    }

    fn close(&mut self) {
        self.pending = None;
        self.stream = None;
        if self.device.take().is_some() {
            debug!("V4L2 device closed");
        }
    }
}
