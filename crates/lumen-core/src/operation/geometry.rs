//! Geometric operations: resize and rotate.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::raster::{saturate, Raster};
use super::OperationKind;
use crate::error::OperationError;

/// Linear resampling to `(round(w * scale_x), round(h * scale_y))`.
pub fn resize(
    image: &DynamicImage,
    scale_x: f64,
    scale_y: f64,
) -> Result<DynamicImage, OperationError> {
    let (width, height) = image.dimensions();
    let new_width = (width as f64 * scale_x).round();
    let new_height = (height as f64 * scale_y).round();

    let in_range = |v: f64| (1.0..=u32::MAX as f64).contains(&v);
    if !in_range(new_width) || !in_range(new_height) {
        return Err(OperationError::InvalidParameters {
            operation: OperationKind::Resize,
            message: format!(
                "scaling {width}x{height} by ({scale_x}, {scale_y}) gives an empty or oversized image"
            ),
        });
    }

    Ok(image.resize_exact(new_width as u32, new_height as u32, FilterType::Triangle))
}

/// Rotate counter-clockwise about the image center.
///
/// Whole quarter turns are exact and swap the canvas for 90/270 degrees.
/// Any other angle keeps the input canvas, clips, and fills uncovered area
/// with black.
pub fn rotate(image: &DynamicImage, angle: f64) -> Result<DynamicImage, OperationError> {
    let normalized = angle.rem_euclid(360.0);
    let quarters = (normalized / 90.0).round();
    if (normalized - quarters * 90.0).abs() < 1e-9 {
        return Ok(match quarters as u32 % 4 {
            0 => image.clone(),
            // image's rotate90 is clockwise
            1 => image.rotate270(),
            2 => image.rotate180(),
            _ => image.rotate90(),
        });
    }

    let src = Raster::from_image(image);
    let mut dst = src.blank_like();
    let (cos, sin) = {
        let theta = angle.to_radians();
        (theta.cos(), theta.sin())
    };
    let cx = src.width as f64 / 2.0;
    let cy = src.height as f64 / 2.0;

    for y in 0..dst.height as usize {
        for x in 0..dst.width as usize {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            // inverse map from destination to source
            let sx = cos * dx - sin * dy + cx;
            let sy = sin * dx + cos * dy + cy;
            for c in 0..src.channels {
                dst.set(x, y, c, bilinear(&src, sx, sy, c));
            }
        }
    }

    dst.into_image(OperationKind::Rotate)
}

/// Bilinear sample where out-of-bounds neighbors contribute black.
fn bilinear(src: &Raster, x: f64, y: f64, c: usize) -> u8 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let sample = |px: i64, py: i64| -> f32 {
        if px < 0 || py < 0 || px >= src.width as i64 || py >= src.height as i64 {
            0.0
        } else {
            src.get(px as usize, py as usize, c) as f32
        }
    };

    let top = sample(x0, y0) * (1.0 - fx) + sample(x0 + 1, y0) * fx;
    let bottom = sample(x0, y0 + 1) * (1.0 - fx) + sample(x0 + 1, y0 + 1) * fx;
    saturate(top * (1.0 - fy) + bottom * fy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_zero_scale_rounding_rejected() {
        let image = DynamicImage::new_rgb8(10, 10);
        assert!(resize(&image, 0.01, 1.0).is_err());
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        // marker in the top-right corner of a 3x2 image
        let mut gray = GrayImage::new(3, 2);
        gray.put_pixel(2, 0, Luma([255]));
        let rotated = rotate(&DynamicImage::ImageLuma8(gray), 90.0).unwrap();
        assert_eq!(rotated.dimensions(), (2, 3));
        // counter-clockwise moves top-right to top-left
        assert_eq!(rotated.to_luma8().get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(5, 4, |x, y| Luma([(x + y) as u8])));
        let rotated = rotate(&image, -360.0).unwrap();
        assert_eq!(rotated.as_bytes(), image.as_bytes());
    }

    #[test]
    fn test_arbitrary_angle_fills_corners_black() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([200])));
        let rotated = rotate(&image, 45.0).unwrap().to_luma8();
        assert_eq!(rotated.get_pixel(0, 0)[0], 0);
        assert_eq!(rotated.get_pixel(20, 20)[0], 200);
    }
}
