// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection — finds the largest convex four-sided contour
// in a frame via one Gaussian blur, Canny edges, dilation and border
// following. The luma, blur, gradient and edge planes live in a pooled
// scratch set that is only reallocated when the resolution changes.

mod canny;
mod scratch;

pub use scratch::ScratchPool;

use docscan_core::{Point2D, ScannerConfig};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate_mut;
use tracing::{debug, instrument, trace, warn};

use self::canny::canny_into;
use crate::filter::{gaussian_blur_into, gaussian_kernel, luminance_into};
use crate::geometry::{approximate_closed_polygon, arc_length, is_convex, polygon_area};
use crate::raster::RasterImage;

/// Frames smaller than this on either side are never searched.
const MIN_FRAME_SIDE: u32 = 8;

/// The subset of [`ScannerConfig`] the detector reads.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParams {
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    pub blur_kernel_size: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilate_kernel_size: u32,
    pub approx_epsilon_fraction: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for DetectorParams {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            min_area_ratio: config.min_area_ratio,
            max_area_ratio: config.max_area_ratio,
            blur_kernel_size: config.blur_kernel_size,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            dilate_kernel_size: config.dilate_kernel_size,
            approx_epsilon_fraction: config.approx_epsilon_fraction,
        }
    }
}

/// An accepted, still unordered, document outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCandidate {
    /// The four polygon vertices in contour order.
    pub points: [Point2D; 4],
    /// Area enclosed by the source contour, in square pixels.
    pub area: f64,
}

/// Per-frame document boundary detector.
///
/// Holds the tuning parameters, a precomputed blur kernel and a
/// [`ScratchPool`] so that consecutive frames of the same resolution do not
/// allocate the luminance and blur buffers again.
#[derive(Debug)]
pub struct EdgeContourDetector {
    params: DetectorParams,
    kernel: Vec<f32>,
    pool: ScratchPool,
}

impl EdgeContourDetector {
    // -- Construction ---------------------------------------------------------

    pub fn new(params: DetectorParams) -> Self {
        let kernel = gaussian_kernel(params.blur_kernel_size);
        Self {
            params,
            kernel,
            pool: ScratchPool::new(),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(DetectorParams::from(config))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn scratch(&self) -> &ScratchPool {
        &self.pool
    }

    /// Release the scratch buffers (e.g. when the session stops).
    pub fn release_scratch(&mut self) {
        self.pool.clear();
    }

    // -- Detection ------------------------------------------------------------

    /// Find the best document outline in `frame`, or `None`.
    ///
    /// Never fails: anything unusable about the frame (too small, no edges,
    /// non-finite geometry) is reported as "no detection" for this frame only.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn detect(&mut self, frame: &RasterImage) -> Option<QuadCandidate> {
        let (width, height) = frame.dimensions();
        if width < MIN_FRAME_SIDE || height < MIN_FRAME_SIDE {
            debug!("Frame too small to search");
            return None;
        }

        let radius = (self.params.dilate_kernel_size / 2).min(u32::from(u8::MAX)) as u8;
        let contours = {
            let bufs = self.pool.buffers(width, height);
            luminance_into(frame, bufs.gray);
            gaussian_blur_into(bufs.gray, bufs.blurred, bufs.row_pass, &self.kernel);
            canny_into(
                bufs.blurred,
                bufs.edges,
                bufs.gradients,
                self.params.canny_low,
                self.params.canny_high,
            );
            if radius > 0 {
                dilate_mut(bufs.edges, Norm::LInf, radius);
            }
            find_contours::<i32>(bufs.edges)
        };

        let frame_area = f64::from(width) * f64::from(height);
        let best = self.select_best(&contours, frame_area);

        match best {
            Some(candidate) if candidate.points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) => {
                debug!(
                    area = candidate.area,
                    contours = contours.len(),
                    "Document candidate found"
                );
                Some(candidate)
            }
            Some(_) => {
                warn!("Discarding candidate with non-finite coordinates");
                None
            }
            None => {
                trace!(contours = contours.len(), "No document candidate");
                None
            }
        }
    }

    /// Apply the area, vertex-count and convexity filters to the external
    /// contours and keep the largest survivor.
    fn select_best(&self, contours: &[Contour<i32>], frame_area: f64) -> Option<QuadCandidate> {
        let min_area = self.params.min_area_ratio * frame_area;
        let max_area = self.params.max_area_ratio * frame_area;

        let mut best: Option<QuadCandidate> = None;
        for contour in contours {
            if contour.parent.is_some() || !matches!(contour.border_type, BorderType::Outer) {
                continue;
            }
            if contour.points.len() < 4 {
                continue;
            }

            let points: Vec<Point2D> = contour
                .points
                .iter()
                .map(|p| Point2D::new(f64::from(p.x), f64::from(p.y)))
                .collect();

            let area = polygon_area(&points);
            if !area.is_finite() || area < min_area || area > max_area {
                continue;
            }

            let epsilon = self.params.approx_epsilon_fraction * arc_length(&points, true);
            let approx = approximate_closed_polygon(&points, epsilon);
            if approx.len() != 4 || !is_convex(&approx) {
                trace!(vertices = approx.len(), area, "Contour rejected after approximation");
                continue;
            }

            if best.is_none_or(|b| area > b.area) {
                best = Some(QuadCandidate {
                    points: [approx[0], approx[1], approx[2], approx[3]],
                    area,
                });
            }
        }
        best
    }
}

impl Default for EdgeContourDetector {
    fn default() -> Self {
        Self::new(DetectorParams::default())
    }
}
