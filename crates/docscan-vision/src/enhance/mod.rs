// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Post-rectification filters: contrast enhancement, grayscale and adaptive
// black & white. Every filter is a pure image-to-image function.

pub mod clahe;
pub mod threshold;

use docscan_core::{EnhanceMethod, FilterMode, ScannerConfig};
use image::{GrayImage, RgbaImage};
use tracing::{debug, instrument};

use crate::raster::{Pixels, RasterImage};

/// Applies the capture filter chosen by the user.
///
/// Holds only the tuning constants, so one instance can serve any number of
/// captures.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEnhancer {
    method: EnhanceMethod,
    alpha: f32,
    beta: f32,
    clip_limit: f32,
    tile_size: u32,
    threshold_window: u32,
    threshold_constant: f32,
}

impl ImageEnhancer {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            method: config.enhance_method,
            alpha: config.enhance_alpha,
            beta: config.enhance_beta,
            clip_limit: config.clahe_clip_limit,
            tile_size: config.clahe_tile_size,
            threshold_window: config.adaptive_threshold_window,
            threshold_constant: config.adaptive_threshold_constant,
        }
    }

    pub fn method(&self) -> EnhanceMethod {
        self.method
    }

    /// Run `mode` over `image`.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn apply(&self, image: &RasterImage, mode: FilterMode) -> RasterImage {
        let out = match mode {
            FilterMode::None => image.clone(),
            FilterMode::Enhance => match self.method {
                EnhanceMethod::Linear => self.linear(image),
                EnhanceMethod::Clahe => self.clahe(image),
            },
            FilterMode::Grayscale => image.to_luma(),
            FilterMode::BlackWhite => self.black_white(image),
        };
        debug!(channels = out.channels(), "Filter applied");
        out
    }

    // -- Enhance --------------------------------------------------------------

    /// `out = clamp(in * alpha + beta)` on every colour channel; alpha is kept.
    pub fn linear(&self, image: &RasterImage) -> RasterImage {
        let adjust = |v: u8| (f32::from(v) * self.alpha + self.beta).round().clamp(0.0, 255.0) as u8;
        let mut table = [0u8; 256];
        for (v, slot) in table.iter_mut().enumerate() {
            *slot = adjust(v as u8);
        }

        match image.pixels() {
            Pixels::Rgba(rgba) => {
                let mut out = rgba.clone();
                for px in out.pixels_mut() {
                    for c in &mut px.0[..3] {
                        *c = table[*c as usize];
                    }
                }
                RasterImage::wrap_rgba(out)
            }
            Pixels::Luma(gray) => {
                let mut out = gray.clone();
                for v in out.iter_mut() {
                    *v = table[*v as usize];
                }
                RasterImage::wrap_luma(out)
            }
        }
    }

    /// CLAHE on the luminance channel. Colour images keep their chroma: with
    /// Cr and Cb fixed, every channel shifts by the change in luma.
    pub fn clahe(&self, image: &RasterImage) -> RasterImage {
        match image.pixels() {
            Pixels::Luma(gray) => {
                RasterImage::wrap_luma(clahe::clahe(gray, self.clip_limit, self.tile_size))
            }
            Pixels::Rgba(rgba) => {
                let luma = image.luma_image();
                let equalized = clahe::clahe(&luma, self.clip_limit, self.tile_size);
                RasterImage::wrap_rgba(shift_luma(rgba, &luma, &equalized))
            }
        }
    }

    // -- Black & white --------------------------------------------------------

    pub fn black_white(&self, image: &RasterImage) -> RasterImage {
        let gray = image.luma_image();
        RasterImage::wrap_luma(threshold::adaptive_threshold(
            &gray,
            self.threshold_window,
            self.threshold_constant,
        ))
    }
}

impl Default for ImageEnhancer {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

fn shift_luma(rgba: &RgbaImage, before: &GrayImage, after: &GrayImage) -> RgbaImage {
    let mut out = rgba.clone();
    for ((px, old), new) in out.pixels_mut().zip(before.iter()).zip(after.iter()) {
        let delta = i16::from(*new) - i16::from(*old);
        for c in &mut px.0[..3] {
            *c = (i16::from(*c) + delta).clamp(0, 255) as u8;
        }
    }
    out
}
