// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Low-level pixel filters shared by detection and enhancement: BT.601
// luminance and a separable Gaussian blur that writes into caller-owned
// buffers, so the per-frame loop can reuse its scratch memory.

use image::GrayImage;

use crate::raster::RasterImage;

/// BT.601 luma with integer rounding.
#[inline]
pub fn bt601(r: u8, g: u8, b: u8) -> u8 {
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b) + 500) / 1000) as u8
}

/// Write the luminance of `src` into `dst`.
///
/// `dst` must have the same dimensions as `src`.
pub fn luminance_into(src: &RasterImage, dst: &mut GrayImage) {
    debug_assert_eq!(src.dimensions(), dst.dimensions());
    match src.as_rgba() {
        Some(rgba) => {
            for (out, px) in dst.iter_mut().zip(rgba.as_raw().chunks_exact(4)) {
                *out = bt601(px[0], px[1], px[2]);
            }
        }
        None => dst.copy_from_slice(src.as_bytes()),
    }
}

/// Normalized 1-D Gaussian kernel of odd `size`.
///
/// The standard deviation is derived from the size the way common vision
/// libraries do when no sigma is given: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1;
    if size == 1 {
        return vec![1.0];
    }
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (size / 2) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge
/// pixel (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect101(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m >= n { period - m } else { m }) as usize
}

/// Separable convolution of `src` with `kernel` along both axes into `dst`.
///
/// `scratch` holds the horizontal pass; it is resized as needed and its
/// previous contents are ignored. `dst` must match `src` in size.
pub fn gaussian_blur_into(src: &GrayImage, dst: &mut GrayImage, scratch: &mut Vec<f32>, kernel: &[f32]) {
    debug_assert_eq!(src.dimensions(), dst.dimensions());
    let (w, h) = (src.width() as usize, src.height() as usize);
    let radius = (kernel.len() / 2) as i64;
    let input = src.as_raw();

    scratch.clear();
    scratch.resize(w * h, 0.0);

    for y in 0..h {
        let row = &input[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect101(x as i64 + k as i64 - radius, w as i64);
                acc += weight * f32::from(row[sx]);
            }
            scratch[y * w + x] = acc;
        }
    }

    let out: &mut [u8] = &mut **dst;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect101(y as i64 + k as i64 - radius, h as i64);
                acc += weight * scratch[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Allocating convenience wrapper around [`gaussian_blur_into`].
pub fn gaussian_blur(src: &GrayImage, kernel_size: u32) -> GrayImage {
    let mut dst = GrayImage::new(src.width(), src.height());
    let mut scratch = Vec::new();
    gaussian_blur_into(src, &mut dst, &mut scratch, &gaussian_kernel(kernel_size));
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(5);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[4]).abs() < 1e-7);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn even_size_is_rounded_up_to_odd() {
        assert_eq!(gaussian_kernel(4).len(), 5);
        assert_eq!(gaussian_kernel(0), vec![1.0]);
    }

    #[test]
    fn reflect_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-7, 1), 0);
    }

    #[test]
    fn blur_of_flat_image_is_flat() {
        let img = GrayImage::from_pixel(9, 7, Luma([123u8]));
        let blurred = gaussian_blur(&img, 5);
        assert!(blurred.pixels().all(|p| p.0[0] == 123));
    }

    #[test]
    fn blur_softens_a_step() {
        let img = GrayImage::from_fn(10, 1, |x, _| Luma([if x < 5 { 0 } else { 255 }]));
        let blurred = gaussian_blur(&img, 5);
        let v4 = blurred.get_pixel(4, 0).0[0];
        let v5 = blurred.get_pixel(5, 0).0[0];
        assert!(v4 > 0 && v4 < 128);
        assert!(v5 > 128 && v5 < 255);
    }
}
