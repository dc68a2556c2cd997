//! Morphological erosion and dilation over a square structuring element.

use image::DynamicImage;

use super::raster::Raster;
use super::OperationKind;
use crate::error::OperationError;

pub fn erode(
    image: &DynamicImage,
    kernel_size: u32,
    iterations: u32,
) -> Result<DynamicImage, OperationError> {
    morph(image, kernel_size, iterations, std::cmp::min).into_image(OperationKind::Erosion)
}

pub fn dilate(
    image: &DynamicImage,
    kernel_size: u32,
    iterations: u32,
) -> Result<DynamicImage, OperationError> {
    morph(image, kernel_size, iterations, std::cmp::max).into_image(OperationKind::Dilation)
}

/// Apply `pick` (min or max) over a `k x k` window `iterations` times.
/// Out-of-bounds neighbors are ignored.
fn morph(
    image: &DynamicImage,
    kernel_size: u32,
    iterations: u32,
    pick: fn(u8, u8) -> u8,
) -> Raster {
    let mut current = Raster::from_image(image);
    let k = kernel_size as i64;
    let before = k / 2;
    let after = k - 1 - before;

    for _ in 0..iterations {
        let horizontal = pass(&current, before, after, pick, true);
        current = pass(&horizontal, before, after, pick, false);
    }
    current
}

/// One separable 1-D pass along x (`along_x`) or y.
fn pass(src: &Raster, before: i64, after: i64, pick: fn(u8, u8) -> u8, along_x: bool) -> Raster {
    let mut dst = src.blank_like();
    let (w, h) = (src.width as i64, src.height as i64);
    for y in 0..h {
        for x in 0..w {
            for c in 0..src.channels {
                let mut acc = src.get(x as usize, y as usize, c);
                for d in -before..=after {
                    let (sx, sy) = if along_x { (x + d, y) } else { (x, y + d) };
                    if sx < 0 || sy < 0 || sx >= w || sy >= h {
                        continue;
                    }
                    acc = pick(acc, src.get(sx as usize, sy as usize, c));
                }
                dst.set(x as usize, y as usize, c, acc);
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn dot() -> DynamicImage {
        let mut gray = GrayImage::new(9, 9);
        gray.put_pixel(4, 4, Luma([255]));
        DynamicImage::ImageLuma8(gray)
    }

    #[test]
    fn test_dilation_grows_dot_to_square() {
        let out = dilate(&dot(), 3, 1).unwrap();
        let lit = out.as_bytes().iter().filter(|&&v| v == 255).count();
        assert_eq!(lit, 9);
    }

    #[test]
    fn test_iterations_compound() {
        let out = dilate(&dot(), 3, 2).unwrap();
        let lit = out.as_bytes().iter().filter(|&&v| v == 255).count();
        assert_eq!(lit, 25);
    }

    #[test]
    fn test_erosion_removes_dot() {
        let out = erode(&dot(), 3, 1).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_erosion_ignores_border() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(5, 5, Luma([200])));
        let out = erode(&image, 3, 1).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 200));
    }
}
