// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner ordering — canonicalize four unordered points into TL, TR, BR, BL.

use std::cmp::Ordering;

use docscan_core::{Point2D, Quad};

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Stable-sorts by `y`, splits into the top two and bottom two, then
/// stable-sorts each pair by `x`. For a convex quad in general position the
/// result is the same for all 24 input permutations.
pub fn order_corners(points: [Point2D; 4]) -> Quad {
    let mut sorted = points;
    sorted.sort_by(|a, b| cmp_f64(a.y, b.y));

    let mut top = [sorted[0], sorted[1]];
    let mut bottom = [sorted[2], sorted[3]];
    top.sort_by(|a, b| cmp_f64(a.x, b.x));
    bottom.sort_by(|a, b| cmp_f64(a.x, b.x));

    Quad::new([top[0], top[1], bottom[1], bottom[0]])
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
