// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive binarization against a Gaussian-weighted local mean.

use image::GrayImage;

use crate::filter::{gaussian_blur_into, gaussian_kernel};

/// Binarize `gray` against its local Gaussian-weighted mean.
///
/// A pixel becomes white (255) when it is brighter than
/// `local_mean - constant`, black (0) otherwise. `window` is the neighbourhood
/// side length and is rounded up to the next odd value.
pub fn adaptive_threshold(gray: &GrayImage, window: u32, constant: f32) -> GrayImage {
    let kernel = gaussian_kernel(window);
    let mut mean = GrayImage::new(gray.width(), gray.height());
    let mut scratch = Vec::new();
    gaussian_blur_into(gray, &mut mean, &mut scratch, &kernel);

    let mut output = GrayImage::new(gray.width(), gray.height());
    for ((out, src), local) in output.iter_mut().zip(gray.iter()).zip(mean.iter()) {
        *out = if f32::from(*src) > f32::from(*local) - constant { 255 } else { 0 };
    }
    output
}
