//! Packed 4:2:2 frame decoding.

use crate::catalog::FrameGeometry;
use crate::error::DecodeError;
use image::{Rgb, RgbImage};

/// Bytes per `[Y0, U, Y1, V]` macropixel.
pub const MACROPIXEL_LEN: usize = 4;

/// A three-plane 4:2:2 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub y: Vec<u8>,
    pub cb: Vec<u8>,
    pub cr: Vec<u8>,
    pub y_stride: usize,
    pub c_stride: usize,
    pub width: u32,
    pub height: u32,
}

/// Split a packed `[Y0, U, Y1, V]` buffer into luma and chroma planes.
///
/// Strides and the pixel rectangle come from `geometry`. The buffer length is
/// only required to be a whole number of macropixels.
pub fn decode(raw: &[u8], geometry: &FrameGeometry) -> Result<DecodedImage, DecodeError> {
    if raw.len() % MACROPIXEL_LEN != 0 {
        return Err(DecodeError::InvalidFrameLength(raw.len()));
    }

    let macropixels = raw.len() / MACROPIXEL_LEN;
    let mut y = Vec::with_capacity(macropixels * 2);
    let mut cb = Vec::with_capacity(macropixels);
    let mut cr = Vec::with_capacity(macropixels);

    for chunk in raw.chunks_exact(MACROPIXEL_LEN) {
        y.push(chunk[0]);
        cb.push(chunk[1]);
        y.push(chunk[2]);
        cr.push(chunk[3]);
    }

    Ok(DecodedImage {
        y,
        cb,
        cr,
        y_stride: geometry.y_stride,
        c_stride: geometry.c_stride,
        width: geometry.width,
        height: geometry.height,
    })
}

impl DecodedImage {
    /// Convert to RGB using full-range BT.601 (JFIF) coefficients.
    ///
    /// Each chroma sample covers two horizontally adjacent pixels.
    pub fn to_rgb(&self) -> Result<RgbImage, DecodeError> {
        let (w, h) = (self.width as usize, self.height as usize);
        let needed_y = if h == 0 { 0 } else { self.y_stride * (h - 1) + w };
        let needed_c = if h == 0 { 0 } else { self.c_stride * (h - 1) + w.div_ceil(2) };

        if self.y.len() < needed_y || self.cb.len() < needed_c || self.cr.len() < needed_c {
            return Err(DecodeError::GeometryMismatch {
                expected: needed_y,
                actual: self.y.len(),
            });
        }

        let mut rgb = RgbImage::new(self.width, self.height);
        for (x, row, pixel) in rgb.enumerate_pixels_mut() {
            let (x, row) = (x as usize, row as usize);
            let luma = self.y[row * self.y_stride + x];
            let ci = row * self.c_stride + x / 2;
            *pixel = ycbcr_to_rgb(luma, self.cb[ci], self.cr[ci]);
        }
        Ok(rgb)
    }
}

fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> Rgb<u8> {
    let y = f32::from(y);
    let cb = f32::from(cb) - 128.0;
    let cr = f32::from(cr) - 128.0;

    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;

    Rgb([clamp_u8(r), clamp_u8(g), clamp_u8(b)])
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32) -> FrameGeometry {
        FrameGeometry::new(width, height)
    }

    #[test]
    fn test_plane_lengths_for_whole_macropixels() {
        for n in (0..=64).step_by(4) {
            let raw: Vec<u8> = (0..n as u8).collect();
            let image = decode(&raw, &geometry(2, 1)).unwrap();
            assert_eq!(image.y.len(), n / 2);
            assert_eq!(image.cb.len(), n / 4);
            assert_eq!(image.cr.len(), n / 4);
            assert_eq!(image.y.len(), 2 * image.cb.len());
        }
    }

    #[test]
    fn test_rejects_partial_macropixel() {
        for n in [1, 2, 3, 5, 6, 7, 641] {
            let raw = vec![0u8; n];
            assert_eq!(
                decode(&raw, &geometry(2, 1)),
                Err(DecodeError::InvalidFrameLength(n))
            );
        }
    }

    #[test]
    fn test_plane_order_preserved() {
        let raw = [10, 20, 11, 30, 12, 21, 13, 31];
        let image = decode(&raw, &geometry(4, 1)).unwrap();
        assert_eq!(image.y, vec![10, 11, 12, 13]);
        assert_eq!(image.cb, vec![20, 21]);
        assert_eq!(image.cr, vec![30, 31]);
    }

    #[test]
    fn test_strides_follow_geometry() {
        let raw = vec![0u8; 320 * 240 * 2];
        let image = decode(&raw, &geometry(320, 240)).unwrap();
        assert_eq!(image.y_stride, 320);
        assert_eq!(image.c_stride, 160);
        assert_eq!((image.width, image.height), (320, 240));
    }

    #[test]
    fn test_to_rgb_neutral_chroma_is_gray() {
        // Two pixels per macropixel, 4x2 image
        let raw: Vec<u8> = [100u8, 128, 200, 128].repeat(4);
        let rgb = decode(&raw, &geometry(4, 2)).unwrap().to_rgb().unwrap();
        assert_eq!(rgb.dimensions(), (4, 2));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 200, 200]));
        assert_eq!(rgb.get_pixel(3, 1), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_to_rgb_red_chroma() {
        let raw = [76u8, 85, 76, 255];
        let rgb = decode(&raw, &geometry(2, 1)).unwrap().to_rgb().unwrap();
        let Rgb([r, g, b]) = *rgb.get_pixel(0, 0);
        assert!(r > 240, "r = {}", r);
        assert!(g < 10, "g = {}", g);
        assert!(b < 10, "b = {}", b);
    }

    #[test]
    fn test_to_rgb_short_frame_is_geometry_mismatch() {
        let raw = vec![0u8; 8];
        let image = decode(&raw, &geometry(640, 480)).unwrap();
        assert_eq!(
            image.to_rgb(),
            Err(DecodeError::GeometryMismatch {
                expected: 640 * 480,
                actual: 4,
            })
        );
    }
}
