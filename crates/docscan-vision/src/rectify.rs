// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — maps an ordered quad onto an axis-aligned
// rectangle sized from the quad's own edge lengths.

use docscan_core::error::{DocscanError, Result};
use docscan_core::Quad;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{distance, is_degenerate};
use crate::raster::{Pixels, RasterImage};

/// Quads enclosing less than this many square pixels cannot be rectified.
const MIN_QUAD_AREA: f64 = 1.0;

/// Largest output the rectifier will allocate (64 megapixels).
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 26;

/// Fill for destination pixels that map outside the source frame.
const BORDER_RGBA: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BORDER_LUMA: Luma<u8> = Luma([0]);

/// Warps a captured frame so the document quad fills the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveRectifier;

impl PerspectiveRectifier {
    pub fn new() -> Self {
        Self
    }

    /// Output size for `quad`: the longer of the two horizontal edges by the
    /// longer of the two vertical edges, rounded.
    pub fn output_size(quad: &Quad) -> (f64, f64) {
        let width = distance(quad.top_right(), quad.top_left())
            .max(distance(quad.bottom_right(), quad.bottom_left()));
        let height = distance(quad.bottom_left(), quad.top_left())
            .max(distance(quad.bottom_right(), quad.top_right()));
        (width.round(), height.round())
    }

    /// Rectify `frame` using the ordered `quad` (TL, TR, BR, BL) given in the
    /// frame's pixel coordinates.
    ///
    /// Corners may lie outside the frame; those output pixels get the border
    /// fill. Fails with [`DocscanError::DegenerateGeometry`] when the output
    /// would be empty or larger than [`MAX_OUTPUT_PIXELS`], or the quad does
    /// not define a projective mapping. The result has the same channel
    /// layout as the input.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn rectify(&self, frame: &RasterImage, quad: &Quad) -> Result<RasterImage> {
        if is_degenerate(quad, MIN_QUAD_AREA) {
            warn!(?quad, "Refusing to rectify degenerate quad");
            return Err(DocscanError::DegenerateGeometry(format!(
                "quad is colinear, non-finite or encloses under {MIN_QUAD_AREA} px²"
            )));
        }

        let (width, height) = Self::output_size(quad);
        if !(width >= 1.0 && height >= 1.0) || width > f64::from(u32::MAX) || height > f64::from(u32::MAX) {
            return Err(DocscanError::DegenerateGeometry(format!(
                "output size {width}x{height} is not usable"
            )));
        }
        let (out_w, out_h) = (width as u32, height as u32);
        if u64::from(out_w) * u64::from(out_h) > MAX_OUTPUT_PIXELS {
            warn!(out_w, out_h, "Refusing oversized rectification");
            return Err(DocscanError::DegenerateGeometry(format!(
                "output size {out_w}x{out_h} exceeds {MAX_OUTPUT_PIXELS} pixels"
            )));
        }

        let src = quad.corners().map(|p| (p.x as f32, p.y as f32));
        let dst = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];

        // from_control_points maps `src` to `dst`; warp_into samples through
        // the inverse for each destination pixel.
        let projection = Projection::from_control_points(src, dst).ok_or_else(|| {
            warn!("Projective transform is singular");
            DocscanError::DegenerateGeometry("projective transform is singular".into())
        })?;

        debug!(out_w, out_h, "Warping");
        let rectified = match frame.pixels() {
            Pixels::Rgba(rgba) => {
                let mut output = RgbaImage::new(out_w, out_h);
                warp_into(rgba, &projection, Interpolation::Bilinear, BORDER_RGBA, &mut output);
                RasterImage::wrap_rgba(output)
            }
            Pixels::Luma(gray) => {
                let mut output = GrayImage::new(out_w, out_h);
                warp_into(gray, &projection, Interpolation::Bilinear, BORDER_LUMA, &mut output);
                RasterImage::wrap_luma(output)
            }
        };

        info!(out_w, out_h, "Perspective correction applied");
        Ok(rectified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::Point2D;

    fn rect_quad(x0: f64, y0: f64, x1: f64, y1: f64) -> Quad {
        Quad::new([
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
        ])
    }

    fn gradient(w: u32, h: u32) -> RasterImage {
        let img = GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        RasterImage::from_gray_image(img).unwrap()
    }

    #[test]
    fn output_size_uses_longest_edges() {
        let quad = Quad::new([
            Point2D::new(10.0, 10.0),
            Point2D::new(110.0, 10.0),
            Point2D::new(130.0, 90.0),
            Point2D::new(0.0, 90.0),
        ]);
        let (w, h) = PerspectiveRectifier::output_size(&quad);
        assert_eq!(w, 130.0);
        assert_eq!(h, (80.0f64.hypot(20.0)).round());
    }

    #[test]
    fn unrotated_rectangle_keeps_its_size() {
        let frame = gradient(300, 200);
        let out = PerspectiveRectifier::new()
            .rectify(&frame, &rect_quad(20.0, 30.0, 270.0, 180.0))
            .unwrap();
        assert_eq!(out.dimensions(), (250, 150));
        assert!(out.is_luma());
    }

    #[test]
    fn full_frame_quad_is_identity() {
        let frame = gradient(64, 48);
        let out = PerspectiveRectifier::new()
            .rectify(&frame, &rect_quad(0.0, 0.0, 64.0, 48.0))
            .unwrap();
        assert_eq!(out.dimensions(), (64, 48));

        let src = frame.as_luma().unwrap();
        let dst = out.as_luma().unwrap();
        // Edge pixels may sample the border; compare the interior.
        for y in 1..47 {
            for x in 1..63 {
                let a = i16::from(src.get_pixel(x, y).0[0]);
                let b = i16::from(dst.get_pixel(x, y).0[0]);
                assert!((a - b).abs() <= 1, "pixel ({x},{y}): {a} vs {b}");
            }
        }
    }

    #[test]
    fn rgba_input_stays_rgba() {
        let frame = RasterImage::from_rgba_image(RgbaImage::from_pixel(40, 40, Rgba([200, 100, 50, 255]))).unwrap();
        let out = PerspectiveRectifier::new()
            .rectify(&frame, &rect_quad(5.0, 5.0, 35.0, 25.0))
            .unwrap();
        assert_eq!(out.channels(), 4);
        let px = out.as_rgba().unwrap().get_pixel(10, 10);
        for (got, want) in px.0.iter().zip([200u8, 100, 50, 255]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", px);
        }
    }

    #[test]
    fn quad_beyond_frame_fills_border() {
        let frame = RasterImage::from_luma(20, 20, vec![200; 400]).unwrap();
        let out = PerspectiveRectifier::new()
            .rectify(&frame, &rect_quad(-10.0, -10.0, 30.0, 30.0))
            .unwrap();
        let gray = out.as_luma().unwrap();
        assert_eq!(out.dimensions(), (40, 40));
        assert_eq!(gray.get_pixel(2, 2).0[0], 0);
        assert_eq!(gray.get_pixel(20, 20).0[0], 200);
    }

    #[test]
    fn oversized_output_is_refused() {
        let frame = gradient(10, 10);
        let huge = rect_quad(0.0, 0.0, 1e6, 1e6);
        let err = PerspectiveRectifier::new().rectify(&frame, &huge).unwrap_err();
        assert!(matches!(err, DocscanError::DegenerateGeometry(_)));
    }

    #[test]
    fn colinear_quad_is_degenerate() {
        let frame = gradient(50, 50);
        let line = Quad::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(20.0, 20.0),
            Point2D::new(30.0, 30.0),
        ]);
        let err = PerspectiveRectifier::new().rectify(&frame, &line).unwrap_err();
        assert!(matches!(err, DocscanError::DegenerateGeometry(_)));
    }

    #[test]
    fn collapsed_quad_is_degenerate() {
        let frame = gradient(50, 50);
        let point = Quad::new([Point2D::new(5.0, 5.0); 4]);
        assert!(matches!(
            PerspectiveRectifier::new().rectify(&frame, &point),
            Err(DocscanError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn rectification_is_deterministic() {
        let frame = gradient(120, 90);
        let quad = Quad::new([
            Point2D::new(12.0, 8.0),
            Point2D::new(100.0, 15.0),
            Point2D::new(110.0, 85.0),
            Point2D::new(5.0, 70.0),
        ]);
        let rectifier = PerspectiveRectifier::new();
        let a = rectifier.rectify(&frame, &quad).unwrap();
        let b = rectifier.rectify(&frame, &quad).unwrap();
        assert_eq!(a, b);
    }
}
