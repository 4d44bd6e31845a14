// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Point and polygon math: distances, shoelace area, convexity, arc length,
// Douglas-Peucker simplification of closed contours, and quad degeneracy checks.

use docscan_core::{Point2D, Quad};

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Point2D, b: Point2D) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Z component of `(a - o) x (b - o)`.
#[inline]
pub fn cross(o: Point2D, a: Point2D, b: Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Signed shoelace area; positive for clockwise order in image coordinates
/// (y pointing down).
pub fn signed_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        acc += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    acc / 2.0
}

/// Unsigned polygon area.
pub fn polygon_area(points: &[Point2D]) -> f64 {
    signed_area(points).abs()
}

/// Unsigned area of a quad, corners taken in stored order.
pub fn quad_area(quad: &Quad) -> f64 {
    polygon_area(quad.corners())
}

/// True when the closed polygon turns the same way at every vertex, with no
/// zero-length or straight turns.
pub fn is_convex(points: &[Point2D]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let turn = cross(points[i], points[(i + 1) % n], points[(i + 2) % n]);
        if turn == 0.0 || !turn.is_finite() {
            return false;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Length of a polyline, including the closing segment when `closed`.
pub fn arc_length(points: &[Point2D], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| distance(w[0], w[1])).sum();
    if closed {
        open + distance(points[points.len() - 1], points[0])
    } else {
        open
    }
}

/// Distance from `p` to the line through `a` and `b`; falls back to the
/// distance to `a` when the segment is degenerate.
fn perpendicular_distance(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mag = dx.hypot(dy);
    if mag < 1e-9 {
        return distance(p, a);
    }
    (dy * p.x - dx * p.y + b.x * a.y - b.y * a.x).abs() / mag
}

/// Iterative Douglas-Peucker on an open polyline; both endpoints are kept.
fn simplify_open(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end - start < 2 {
            continue;
        }
        let mut dmax = 0.0;
        let mut index = start;
        for i in start + 1..end {
            let d = perpendicular_distance(points[i], points[start], points[end]);
            if d > dmax {
                index = i;
                dmax = d;
            }
        }
        if dmax > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplify a closed contour with Douglas-Peucker.
///
/// The curve is split at two mutually distant extreme points (the point
/// farthest from the first sample, then the point farthest from that), which
/// for a document outline are corners, so the arbitrary start of the traced
/// contour never survives as a spurious vertex.
pub fn approximate_closed_polygon(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest_from = |origin: Point2D| {
        points
            .iter()
            .enumerate()
            .fold((0usize, -1.0f64), |best, (i, p)| {
                let d = distance(origin, *p);
                if d > best.1 { (i, d) } else { best }
            })
            .0
    };
    let a = farthest_from(points[0]);
    let b = farthest_from(points[a]);
    if a == b {
        return vec![points[a]];
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };

    // lo..=hi, then hi..end wrapping back to lo.
    let first: Vec<Point2D> = points[lo..=hi].to_vec();
    let second: Vec<Point2D> = points[hi..]
        .iter()
        .chain(points[..=lo].iter())
        .copied()
        .collect();

    let mut result = simplify_open(&first, epsilon);
    let tail = simplify_open(&second, epsilon);
    // Both halves share their endpoints; drop the duplicates.
    result.extend_from_slice(&tail[1..tail.len() - 1]);
    result
}

/// Largest per-axis absolute difference between corresponding corners.
pub fn max_corner_deviation(a: &Quad, b: &Quad) -> f64 {
    a.corners()
        .iter()
        .zip(b.corners().iter())
        .map(|(p, q)| (p.x - q.x).abs().max((p.y - q.y).abs()))
        .fold(0.0, f64::max)
}

/// True when the quad cannot define a projective mapping: non-finite
/// coordinates, area below `min_area`, or three consecutive corners (nearly)
/// on one line.
pub fn is_degenerate(quad: &Quad, min_area: f64) -> bool {
    if !quad.is_finite() || quad_area(quad) < min_area {
        return true;
    }
    let c = quad.corners();
    (0..4).any(|i| {
        let (o, a, b) = (c[i], c[(i + 1) % 4], c[(i + 2) % 4]);
        let scale = distance(o, a) * distance(a, b);
        scale < 1e-9 || (cross(o, a, b).abs() / scale) < 1e-6
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2D> {
        vec![
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
        ]
    }

    /// Dense outline of an axis-aligned rectangle, clockwise from a point in
    /// the middle of the top edge.
    fn dense_rect_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point2D> {
        let mid = (x0 + x1) / 2;
        let mut pts = Vec::new();
        for x in mid..x1 {
            pts.push(Point2D::new(x as f64, y0 as f64));
        }
        for y in y0..y1 {
            pts.push(Point2D::new(x1 as f64, y as f64));
        }
        for x in (x0 + 1..=x1).rev() {
            pts.push(Point2D::new(x as f64, y1 as f64));
        }
        for y in (y0 + 1..=y1).rev() {
            pts.push(Point2D::new(x0 as f64, y as f64));
        }
        for x in x0..mid {
            pts.push(Point2D::new(x as f64, y0 as f64));
        }
        pts
    }

    #[test]
    fn shoelace_area_rectangle() {
        let area = polygon_area(&rect(0.0, 0.0, 10.0, 5.0));
        assert!((area - 50.0).abs() < 1e-9, "Expected 50.0, got {}", area);
    }

    #[test]
    fn convexity_detects_reflex_vertex() {
        assert!(is_convex(&rect(0.0, 0.0, 4.0, 4.0)));
        let dart = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 2.0),
            Point2D::new(0.0, 4.0),
            Point2D::new(1.0, 2.0),
        ];
        assert!(!is_convex(&dart));
    }

    #[test]
    fn arc_length_closed_square() {
        assert!((arc_length(&rect(0.0, 0.0, 3.0, 3.0), true) - 12.0).abs() < 1e-9);
        assert!((arc_length(&rect(0.0, 0.0, 3.0, 3.0), false) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn closed_simplification_recovers_rectangle_corners() {
        let outline = dense_rect_outline(10, 20, 110, 80);
        let eps = 0.02 * arc_length(&outline, true);
        let simplified = approximate_closed_polygon(&outline, eps);
        assert_eq!(simplified.len(), 4, "got {:?}", simplified);
        for corner in rect(10.0, 20.0, 110.0, 80.0) {
            assert!(
                simplified.iter().any(|p| distance(*p, corner) < 1.5),
                "corner {:?} missing from {:?}",
                corner,
                simplified
            );
        }
    }

    #[test]
    fn deviation_is_max_over_axes() {
        let a = Quad::new([Point2D::new(0.0, 0.0); 4]);
        let mut corners = [Point2D::new(0.0, 0.0); 4];
        corners[2] = Point2D::new(3.0, -7.0);
        let b = Quad::new(corners);
        assert_eq!(max_corner_deviation(&a, &b), 7.0);
    }

    #[test]
    fn colinear_quad_is_degenerate() {
        let line = Quad::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(20.0, 0.0),
            Point2D::new(30.0, 0.0),
        ]);
        assert!(is_degenerate(&line, 1.0));
        let square = Quad::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
        ]);
        assert!(!is_degenerate(&square, 1.0));
    }
}
