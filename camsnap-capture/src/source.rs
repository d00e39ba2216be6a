//! The capture device seam.
//!
//! A [`DeviceOpener`] produces a [`CaptureDevice`] for a path. The pipeline
//! only talks to devices through these traits, so fakes and the V4L2 backend
//! are interchangeable.

use crate::catalog::{FourCc, FrameSize, NegotiatedFormat, PixelFormat};
use crate::error::DeviceError;
use std::path::Path;
use std::time::Duration;

/// Opens capture devices by path.
pub trait DeviceOpener {
    type Device: CaptureDevice;

    fn open(&self, path: &Path) -> Result<Self::Device, DeviceError>;
}

/// An open video capture device.
pub trait CaptureDevice {
    /// Pixel formats offered by the device, in enumeration order.
    fn formats(&mut self) -> Result<Vec<PixelFormat>, DeviceError>;

    /// Frame sizes offered for `format`, in enumeration order.
    fn frame_sizes(&mut self, format: FourCc) -> Result<Vec<FrameSize>, DeviceError>;

    /// Request a format. Returns what the device actually applied.
    fn set_format(
        &mut self,
        format: FourCc,
        width: u32,
        height: u32,
    ) -> Result<NegotiatedFormat, DeviceError>;

    fn start_streaming(&mut self) -> Result<(), DeviceError>;

    /// Block until a frame is ready or `timeout` elapses.
    ///
    /// Returns [`DeviceError::Timeout`] when no frame arrived in time.
    fn wait_frame(&mut self, timeout: Duration) -> Result<(), DeviceError>;

    /// Read the frame made ready by the last successful [`wait_frame`](Self::wait_frame).
    fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Stop streaming and release the device.
    fn close(&mut self);
}

/// Owns a device for a session and closes it exactly once on drop.
pub struct DeviceGuard<D: CaptureDevice> {
    device: D,
}

impl<D: CaptureDevice> DeviceGuard<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: CaptureDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.device.close();
    }
}
