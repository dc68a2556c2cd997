//! Interleaved 8-bit raster used by the pixel kernels.
//!
//! Decoded images are normalized to either `Luma8` or `Rgb8`, so kernels only
//! ever see one or three channels.

use image::{DynamicImage, GrayImage, RgbImage};

use crate::error::OperationError;

use super::OperationKind;

/// Normalize a decoded image to 8-bit gray or 8-bit RGB. Alpha is dropped.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other if other.color().has_color() => DynamicImage::ImageRgb8(other.to_rgb8()),
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}

#[derive(Debug, Clone)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl Raster {
    /// Copy pixels out of an image, normalizing its layout first.
    pub fn from_image(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(buf) => Self {
                width: buf.width(),
                height: buf.height(),
                channels: 1,
                data: buf.as_raw().clone(),
            },
            DynamicImage::ImageRgb8(buf) => Self {
                width: buf.width(),
                height: buf.height(),
                channels: 3,
                data: buf.as_raw().clone(),
            },
            other => Self::from_image(&normalize(other.clone())),
        }
    }

    /// A zeroed raster with the given shape.
    pub fn blank(width: u32, height: u32, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0; width as usize * height as usize * channels],
        }
    }

    /// Same shape as `self`, zeroed.
    pub fn blank_like(&self) -> Self {
        Self::blank(self.width, self.height, self.channels)
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, c: usize) -> usize {
        (y * self.width as usize + x) * self.channels + c
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> u8 {
        self.data[self.index(x, y, c)]
    }

    /// Sample with edge replication for out-of-range coordinates.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64, c: usize) -> u8 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(x, y, c)
    }

    /// Sample with mirrored borders that skip the edge pixel (`dcb|abcd|cba`).
    #[inline]
    pub fn get_reflected(&self, x: i64, y: i64, c: usize) -> u8 {
        let x = reflect_101(x, self.width as usize);
        let y = reflect_101(y, self.height as usize);
        self.get(x, y, c)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, c: usize, value: u8) {
        let idx = self.index(x, y, c);
        self.data[idx] = value;
    }

    /// Rebuild an image with the same channel layout.
    pub fn into_image(self, operation: OperationKind) -> Result<DynamicImage, OperationError> {
        let (width, height) = (self.width, self.height);
        let image = match self.channels {
            1 => GrayImage::from_raw(width, height, self.data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgb8),
            _ => None,
        };
        image.ok_or_else(|| OperationError::Buffer {
            operation,
            message: format!("buffer does not match {width}x{height}"),
        })
    }
}

/// Map any coordinate into `0..len` by mirroring around the edge pixels.
#[inline]
pub fn reflect_101(coord: i64, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let folded = coord.rem_euclid(period);
    if folded < len as i64 {
        folded as usize
    } else {
        (period - folded) as usize
    }
}

/// Round and saturate a float sample into a byte.
#[inline]
pub fn saturate(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_normalize_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40])));
        assert!(matches!(normalize(rgba), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_normalize_keeps_gray() {
        let gray = DynamicImage::new_luma16(4, 4);
        assert!(matches!(normalize(gray), DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_clamped_sampling_replicates_edges() {
        let mut raster = Raster::blank(2, 2, 1);
        raster.set(1, 1, 0, 9);
        assert_eq!(raster.get_clamped(5, 5, 0), 9);
        assert_eq!(raster.get_clamped(-1, -1, 0), 0);
    }

    #[test]
    fn test_reflect_101_mirrors_without_repeating_edge() {
        assert_eq!(reflect_101(-1, 4), 1);
        assert_eq!(reflect_101(-3, 4), 3);
        assert_eq!(reflect_101(4, 4), 2);
        assert_eq!(reflect_101(9, 4), 3);
        assert_eq!(reflect_101(-7, 1), 0);
        assert_eq!(reflect_101(5000, 2), 0);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(-4.0), 0);
        assert_eq!(saturate(127.5), 128);
        assert_eq!(saturate(300.0), 255);
    }
}
