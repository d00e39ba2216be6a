//! Device capability values: pixel formats, frame sizes and the negotiated
//! geometry that every decode is driven by.

use crate::error::NegotiationError;
use std::fmt;

/// Four-character pixel format code as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Packed 4:2:2 `[Y0, U, Y1, V]`.
    pub const YUYV: FourCc = FourCc(*b"YUYV");

    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// Little-endian integer form used by V4L2.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn from_u32(code: u32) -> Self {
        Self(code.to_le_bytes())
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// A pixel format offered by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    pub fourcc: FourCc,
    /// Human-readable name from the driver.
    pub description: String,
}

impl PixelFormat {
    pub fn new(fourcc: FourCc, description: impl Into<String>) -> Self {
        Self {
            fourcc,
            description: description.into(),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.fourcc)
    }
}

/// Maximum frame size offered for a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Sort frame sizes by ascending area.
///
/// The sort is stable: sizes of equal area keep the device's enumeration order.
pub fn sort_by_area(sizes: &mut [FrameSize]) {
    sizes.sort_by_key(FrameSize::area);
}

/// An ordered list of choices presented with 1-based indices.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    what: &'static str,
    entries: Vec<T>,
}

/// Pixel formats in device enumeration order.
pub type FormatCatalog = Catalog<PixelFormat>;

/// Frame sizes for one format, ascending by area.
pub type SizeCatalog = Catalog<FrameSize>;

impl<T> Catalog<T> {
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// What the entries are, for prompts and errors ("format", "size").
    pub fn what(&self) -> &'static str {
        self.what
    }

    /// Pick the entry for a 1-based `choice`.
    pub fn select(&self, choice: usize) -> Result<&T, NegotiationError> {
        choice
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .ok_or(NegotiationError::SelectionOutOfRange {
                what: self.what,
                choice,
                len: self.entries.len(),
            })
    }
}

impl FormatCatalog {
    pub fn from_formats(formats: Vec<PixelFormat>) -> Self {
        Self {
            what: "format",
            entries: formats,
        }
    }
}

impl SizeCatalog {
    /// Build a size catalog, sorting ascending by area.
    pub fn from_sizes(mut sizes: Vec<FrameSize>) -> Self {
        sort_by_area(&mut sizes);
        Self {
            what: "size",
            entries: sizes,
        }
    }
}

/// The format the device actually agreed to. Source of truth for decode geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub fourcc: FourCc,
    pub width: u32,
    pub height: u32,
}

impl NegotiatedFormat {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }
}

impl fmt::Display for NegotiatedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{})", self.fourcc, self.width, self.height)
    }
}

/// Plane layout of a 4:2:2 image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    /// Bytes per luma row.
    pub y_stride: usize,
    /// Bytes per chroma row (half width, rounded up).
    pub c_stride: usize,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            y_stride: width as usize,
            c_stride: (width as usize).div_ceil(2),
        }
    }

    /// Luma bytes needed to cover the rectangle.
    pub fn luma_len(&self) -> usize {
        self.y_stride * self.height as usize
    }

    /// Bytes needed per chroma plane to cover the rectangle.
    pub fn chroma_len(&self) -> usize {
        self.c_stride * self.height as usize
    }
}
