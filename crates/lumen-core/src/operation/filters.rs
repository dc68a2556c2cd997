//! Neighborhood filters: box blur, explicit-kernel convolution, Canny edges.

use image::DynamicImage;

use super::params::Kernel;
use super::raster::{reflect_101, saturate, Raster};
use super::OperationKind;
use crate::error::OperationError;

/// Mean over a `k x k` window, borders mirrored (reflect-101).
///
/// Runs as two 1-D passes since the box is separable.
pub fn box_blur(image: &DynamicImage, kernel_size: u32) -> Result<DynamicImage, OperationError> {
    let src = Raster::from_image(image);
    let k = kernel_size as i64;
    let before = k / 2;
    let after = k - 1 - before;
    let (w, h, ch) = (src.width as usize, src.height as usize, src.channels);

    // horizontal pass keeps raw sums
    let mut sums = vec![0u64; src.data.len()];
    for y in 0..h {
        for x in 0..w {
            for c in 0..ch {
                let mut acc = 0u64;
                for dx in -before..=after {
                    acc += src.get_reflected(x as i64 + dx, y as i64, c) as u64;
                }
                sums[src.index(x, y, c)] = acc;
            }
        }
    }

    let area = (k as f64) * (k as f64);
    let mut dst = src.blank_like();
    for y in 0..h {
        for x in 0..w {
            for c in 0..ch {
                let mut acc = 0u64;
                for dy in -before..=after {
                    let yy = reflect_101(y as i64 + dy, h);
                    acc += sums[src.index(x, yy, c)];
                }
                dst.set(x, y, c, saturate((acc as f64 / area) as f32));
            }
        }
    }

    dst.into_image(OperationKind::Blur)
}

/// 2-D correlation with the kernel anchored at its center, borders mirrored
/// (reflect-101).
pub fn convolve(image: &DynamicImage, kernel: &Kernel) -> Result<DynamicImage, OperationError> {
    let src = Raster::from_image(image);
    let mut dst = src.blank_like();
    let anchor_x = (kernel.cols() / 2) as i64;
    let anchor_y = (kernel.rows() / 2) as i64;

    for y in 0..src.height as usize {
        for x in 0..src.width as usize {
            for c in 0..src.channels {
                let mut acc = 0.0f32;
                for row in 0..kernel.rows() {
                    let sy = y as i64 + row as i64 - anchor_y;
                    for col in 0..kernel.cols() {
                        let sx = x as i64 + col as i64 - anchor_x;
                        acc += kernel.weight(row, col) * src.get_reflected(sx, sy, c) as f32;
                    }
                }
                dst.set(x, y, c, saturate(acc));
            }
        }
    }

    dst.into_image(OperationKind::Filter)
}

/// Canny edge map: Sobel gradients, L1 magnitude, non-maximum suppression,
/// then hysteresis between the two thresholds. Gradients replicate edge
/// pixels. Output is single-channel.
pub fn canny(
    image: &DynamicImage,
    low_threshold: f64,
    high_threshold: f64,
) -> Result<DynamicImage, OperationError> {
    let gray = Raster::from_image(&DynamicImage::ImageLuma8(image.to_luma8()));
    let (w, h) = (gray.width as usize, gray.height as usize);
    let px = |x: i64, y: i64| gray.get_clamped(x, y, 0) as i32;

    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];
    let mut magnitude = vec![0i32; w * h];
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as i64, y as i64);
            let dx = (px(xi + 1, yi - 1) + 2 * px(xi + 1, yi) + px(xi + 1, yi + 1))
                - (px(xi - 1, yi - 1) + 2 * px(xi - 1, yi) + px(xi - 1, yi + 1));
            let dy = (px(xi - 1, yi + 1) + 2 * px(xi, yi + 1) + px(xi + 1, yi + 1))
                - (px(xi - 1, yi - 1) + 2 * px(xi, yi - 1) + px(xi + 1, yi - 1));
            let i = y * w + x;
            gx[i] = dx;
            gy[i] = dy;
            magnitude[i] = dx.abs() + dy.abs();
        }
    }

    let mag_at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    // 0 = suppressed, 1 = weak candidate, 2 = strong
    let mut class = vec![0u8; w * h];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = magnitude[i];
            if (m as f64) <= low_threshold {
                continue;
            }
            let (ax, ay) = (gx[i].abs() as i64, gy[i].abs() as i64);
            let (xi, yi) = (x as i64, y as i64);
            // tan(22.5) ~ 0.4142, tan(67.5) ~ 2.4142
            let (n1, n2) = if ay * 10_000 <= ax * 4_142 {
                (mag_at(xi - 1, yi), mag_at(xi + 1, yi))
            } else if ay * 10_000 >= ax * 24_142 {
                (mag_at(xi, yi - 1), mag_at(xi, yi + 1))
            } else if (gx[i] > 0) == (gy[i] > 0) {
                (mag_at(xi - 1, yi - 1), mag_at(xi + 1, yi + 1))
            } else {
                (mag_at(xi + 1, yi - 1), mag_at(xi - 1, yi + 1))
            };
            if m > n1 && m >= n2 {
                if (m as f64) > high_threshold {
                    class[i] = 2;
                    stack.push(i);
                } else {
                    class[i] = 1;
                }
            }
        }
    }

    let mut edges = Raster::blank(gray.width, gray.height, 1);
    while let Some(i) = stack.pop() {
        if edges.data[i] == 255 {
            continue;
        }
        edges.data[i] = 255;
        let (x, y) = ((i % w) as i64, (i / w) as i64);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if class[j] == 1 && edges.data[j] == 0 {
                    class[j] = 2;
                    stack.push(j);
                }
            }
        }
    }

    edges.into_image(OperationKind::Canny)
}
