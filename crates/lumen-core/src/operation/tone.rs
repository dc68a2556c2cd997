//! Per-pixel tone operations.

use image::DynamicImage;

use super::raster::{saturate, Raster};
use super::OperationKind;
use crate::error::OperationError;

/// `clamp(round(v * contrast + brightness))` on every channel.
pub fn contrast_brightness(
    image: &DynamicImage,
    contrast: f64,
    brightness: f64,
) -> Result<DynamicImage, OperationError> {
    let mut raster = Raster::from_image(image);
    let lut: Vec<u8> = (0..=255u16)
        .map(|v| saturate((v as f64 * contrast + brightness) as f32))
        .collect();
    for v in raster.data.iter_mut() {
        *v = lut[*v as usize];
    }
    raster.into_image(OperationKind::ContrastBrightness)
}

/// Binary threshold: `v > value` becomes 255, everything else 0.
pub fn threshold(image: &DynamicImage, value: f64) -> Result<DynamicImage, OperationError> {
    let mut raster = Raster::from_image(image);
    for v in raster.data.iter_mut() {
        *v = if *v as f64 > value { 255 } else { 0 };
    }
    raster.into_image(OperationKind::Threshold)
}

/// Histogram equalization. Gray images are equalized directly; color images
/// have their luma equalized in YCrCb space.
pub fn equalize_histogram(image: &DynamicImage) -> Result<DynamicImage, OperationError> {
    let mut raster = Raster::from_image(image);

    if raster.channels == 1 {
        let lut = equalization_lut(&raster.data);
        for v in raster.data.iter_mut() {
            *v = lut[*v as usize];
        }
        return raster.into_image(OperationKind::HistogramEqualization);
    }

    let pixels = raster.data.len() / 3;
    let mut luma = Vec::with_capacity(pixels);
    let mut chroma = Vec::with_capacity(pixels);
    for px in raster.data.chunks_exact(3) {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        luma.push(saturate(y));
        chroma.push(((r - y) * 0.713 + 128.0, (b - y) * 0.564 + 128.0));
    }

    let lut = equalization_lut(&luma);
    for ((px, y), (cr, cb)) in raster.data.chunks_exact_mut(3).zip(luma).zip(chroma) {
        let y = lut[y as usize] as f32;
        let (cr, cb) = (cr - 128.0, cb - 128.0);
        px[0] = saturate(y + 1.403 * cr);
        px[1] = saturate(y - 0.714 * cr - 0.344 * cb);
        px[2] = saturate(y + 1.773 * cb);
    }

    raster.into_image(OperationKind::HistogramEqualization)
}

/// Cumulative-histogram lookup table. A single-valued input maps to itself.
fn equalization_lut(samples: &[u8]) -> [u8; 256] {
    let mut hist = [0usize; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }

    let mut lut = [0u8; 256];
    let Some(first) = hist.iter().position(|&count| count > 0) else {
        return lut;
    };
    let total = samples.len();
    if hist[first] == total {
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = i as u8;
        }
        return lut;
    }

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut cumulative = 0usize;
    for i in first + 1..256 {
        cumulative += hist[i];
        lut[i] = saturate(cumulative as f32 * scale);
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_contrast_brightness_clamps() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(3, 1, |x, _| {
            Luma([[0u8, 100, 200][x as usize]])
        }));
        let out = contrast_brightness(&image, 1.5, 50.0).unwrap();
        assert_eq!(out.as_bytes(), &[50, 200, 255]);
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(3, 1, |x, _| {
            Luma([[127u8, 128, 129][x as usize]])
        }));
        let out = threshold(&image, 128.0).unwrap();
        assert_eq!(out.as_bytes(), &[0, 0, 255]);
    }

    #[test]
    fn test_equalization_stretches_narrow_range() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 1, |x, _| {
            Luma([100 + x as u8])
        }));
        let out = equalize_histogram(&image).unwrap();
        assert_eq!(out.as_bytes()[0], 0);
        assert_eq!(out.as_bytes()[3], 255);
    }

    #[test]
    fn test_equalization_of_flat_image_is_identity() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([42])));
        let out = equalize_histogram(&image).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 42));
    }

    #[test]
    fn test_equalization_keeps_gray_pixels_gray_in_color() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(4, 1, |x, _| {
            let v = 60 + 20 * x as u8;
            Rgb([v, v, v])
        }));
        let out = equalize_histogram(&image).unwrap().to_rgb8();
        for px in out.pixels() {
            let spread = px.0.iter().max().unwrap() - px.0.iter().min().unwrap();
            assert!(spread <= 2, "pixel {:?} picked up a tint", px);
        }
    }
}
