// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration — tunable detection, stability, and enhancement constants.

use serde::{Deserialize, Serialize};

use crate::error::{DocscanError, Result};

/// Which algorithm backs [`FilterMode::Enhance`](crate::FilterMode::Enhance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceMethod {
    /// `out = clamp(in * alpha + beta)` on every colour channel.
    Linear,
    /// Contrast-limited tile equalization of the luminance channel only.
    #[default]
    Clahe,
}

/// Tunable scanner settings.
///
/// Field names serialize in camelCase (`minAreaRatio`, `cannyLow`, ...). Missing
/// keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Smallest accepted contour area as a fraction of the frame area.
    pub min_area_ratio: f64,
    /// Largest accepted contour area as a fraction of the frame area.
    pub max_area_ratio: f64,
    /// Per-axis corner tolerance (pixels) for two quads to count as stable.
    pub corner_stability_px: f64,
    /// Consecutive stable frames needed to lock.
    pub lock_threshold: u32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Gaussian blur kernel size (odd).
    pub blur_kernel_size: u32,
    /// Square dilation structuring element size (odd).
    pub dilate_kernel_size: u32,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon_fraction: f64,
    /// Algorithm used by the `Enhance` filter.
    pub enhance_method: EnhanceMethod,
    /// Linear enhance gain.
    pub enhance_alpha: f32,
    /// Linear enhance offset.
    pub enhance_beta: f32,
    /// CLAHE histogram clip limit.
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid size per axis.
    pub clahe_tile_size: u32,
    /// Adaptive threshold neighbourhood size (odd).
    pub adaptive_threshold_window: u32,
    /// Constant subtracted from the local weighted mean.
    pub adaptive_threshold_constant: f32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.05,
            max_area_ratio: 0.98,
            corner_stability_px: 40.0,
            lock_threshold: 4,
            canny_low: 30.0,
            canny_high: 100.0,
            blur_kernel_size: 5,
            dilate_kernel_size: 3,
            approx_epsilon_fraction: 0.02,
            enhance_method: EnhanceMethod::Clahe,
            enhance_alpha: 1.2,
            enhance_beta: 10.0,
            clahe_clip_limit: 2.0,
            clahe_tile_size: 8,
            adaptive_threshold_window: 21,
            adaptive_threshold_constant: 10.0,
        }
    }
}

impl ScannerConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check every option against its accepted range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(DocscanError::InvalidConfig(msg));

        if !(self.min_area_ratio > 0.0 && self.min_area_ratio < self.max_area_ratio) {
            return invalid(format!(
                "minAreaRatio must be in (0, maxAreaRatio), got {}",
                self.min_area_ratio
            ));
        }
        if self.max_area_ratio > 1.0 {
            return invalid(format!("maxAreaRatio must be <= 1, got {}", self.max_area_ratio));
        }
        if !(self.corner_stability_px >= 0.0 && self.corner_stability_px.is_finite()) {
            return invalid(format!(
                "cornerStabilityPx must be a finite non-negative value, got {}",
                self.corner_stability_px
            ));
        }
        if self.lock_threshold == 0 {
            return invalid("lockThreshold must be at least 1".into());
        }
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return invalid(format!(
                "cannyLow ({}) must be non-negative and <= cannyHigh ({})",
                self.canny_low, self.canny_high
            ));
        }
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return invalid(format!("blurKernelSize must be odd, got {}", self.blur_kernel_size));
        }
        if self.dilate_kernel_size == 0 || self.dilate_kernel_size % 2 == 0 {
            return invalid(format!(
                "dilateKernelSize must be odd, got {}",
                self.dilate_kernel_size
            ));
        }
        if !(self.approx_epsilon_fraction > 0.0 && self.approx_epsilon_fraction < 1.0) {
            return invalid(format!(
                "approxEpsilonFraction must be in (0, 1), got {}",
                self.approx_epsilon_fraction
            ));
        }
        if !(self.enhance_alpha > 0.0 && self.enhance_alpha.is_finite()) {
            return invalid(format!("enhanceAlpha must be positive, got {}", self.enhance_alpha));
        }
        if !self.enhance_beta.is_finite() {
            return invalid("enhanceBeta must be finite".into());
        }
        if !(self.clahe_clip_limit > 0.0 && self.clahe_clip_limit.is_finite()) {
            return invalid(format!(
                "claheClipLimit must be positive, got {}",
                self.clahe_clip_limit
            ));
        }
        if self.clahe_tile_size == 0 {
            return invalid("claheTileSize must be at least 1".into());
        }
        if self.adaptive_threshold_window < 3 || self.adaptive_threshold_window % 2 == 0 {
            return invalid(format!(
                "adaptiveThresholdWindow must be odd and >= 3, got {}",
                self.adaptive_threshold_window
            ));
        }
        if !self.adaptive_threshold_constant.is_finite() {
            return invalid("adaptiveThresholdConstant must be finite".into());
        }
        Ok(())
    }
}
