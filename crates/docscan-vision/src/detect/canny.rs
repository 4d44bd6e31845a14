// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canny edge map over an already blurred luma buffer: 3x3 Sobel with L1
// magnitude, non-maximum suppression, then hysteresis. No smoothing happens
// here, so the thresholds apply to the gradient of the caller's blur alone.

use image::GrayImage;

const EDGE: u8 = 255;
const WEAK: u8 = 1;

/// Sector bounds for quantizing the gradient direction.
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Gradient planes and the hysteresis stack, reused across frames.
#[derive(Debug, Default)]
pub(crate) struct GradientScratch {
    gx: Vec<i16>,
    gy: Vec<i16>,
    magnitude: Vec<u16>,
    stack: Vec<usize>,
}

impl GradientScratch {
    pub(crate) fn with_capacity(len: usize) -> Self {
        Self {
            gx: Vec::with_capacity(len),
            gy: Vec::with_capacity(len),
            magnitude: Vec::with_capacity(len),
            stack: Vec::new(),
        }
    }

    fn reset(&mut self, len: usize) {
        for plane in [&mut self.gx, &mut self.gy] {
            plane.clear();
            plane.resize(len, 0);
        }
        self.magnitude.clear();
        self.magnitude.resize(len, 0);
        self.stack.clear();
    }
}

/// Write a binary edge map (0 or 255) of `src` into `dst`.
///
/// A pixel is an edge when its magnitude is a local maximum across the
/// gradient direction and it either exceeds `high` or is 8-connected through
/// pixels above `low` to one that does. The one-pixel frame border is never
/// an edge. `dst` must match `src` in size.
pub(crate) fn canny_into(src: &GrayImage, dst: &mut GrayImage, scratch: &mut GradientScratch, low: f32, high: f32) {
    debug_assert_eq!(src.dimensions(), dst.dimensions());
    let (w, h) = (src.width() as usize, src.height() as usize);
    let out: &mut [u8] = &mut **dst;
    out.fill(0);
    if w < 3 || h < 3 {
        return;
    }

    scratch.reset(w * h);
    let px = src.as_raw();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let at = |dx: usize, dy: usize| i16::from(px[(y + dy - 1) * w + x + dx - 1]);
            let gx = -at(0, 0) + at(2, 0) - 2 * at(0, 1) + 2 * at(2, 1) - at(0, 2) + at(2, 2);
            let gy = -at(0, 0) - 2 * at(1, 0) - at(2, 0) + at(0, 2) + 2 * at(1, 2) + at(2, 2);
            let i = y * w + x;
            scratch.gx[i] = gx;
            scratch.gy[i] = gy;
            scratch.magnitude[i] = gx.unsigned_abs() + gy.unsigned_abs();
        }
    }

    let GradientScratch {
        gx,
        gy,
        magnitude,
        stack,
    } = scratch;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = magnitude[i];
            if f32::from(m) <= low {
                continue;
            }

            let ax = f32::from(gx[i].unsigned_abs());
            let ay = f32::from(gy[i].unsigned_abs());
            let (a, b) = if ay <= ax * TAN_22_5 {
                (i - 1, i + 1)
            } else if ay >= ax * TAN_67_5 {
                (i - w, i + w)
            } else if (gx[i] > 0) == (gy[i] > 0) {
                (i - w - 1, i + w + 1)
            } else {
                (i - w + 1, i + w - 1)
            };
            // Strict on one side only, so a two-pixel plateau keeps one pixel.
            if !(m > magnitude[a] && m >= magnitude[b]) {
                continue;
            }

            if f32::from(m) > high {
                out[i] = EDGE;
                stack.push(i);
            } else {
                out[i] = WEAK;
            }
        }
    }

    // Edge and weak pixels are all interior, so every neighbour is in range.
    while let Some(i) = stack.pop() {
        for j in [i - w - 1, i - w, i - w + 1, i - 1, i + 1, i + w - 1, i + w, i + w + 1] {
            if out[j] == WEAK {
                out[j] = EDGE;
                stack.push(j);
            }
        }
    }

    for v in out.iter_mut() {
        if *v == WEAK {
            *v = 0;
        }
    }
}
