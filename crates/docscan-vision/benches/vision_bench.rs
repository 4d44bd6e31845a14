// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docscan-vision hot paths: per-frame detection,
// rectification of a locked quad, and the capture filters.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};

use docscan_core::{FilterMode, Point2D, Quad};
use docscan_vision::{EdgeContourDetector, ImageEnhancer, PerspectiveRectifier, RasterImage};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 640x480 preview-sized frame: dark table with a light page from
/// (80, 60) to (560, 420).
fn preview_frame() -> RasterImage {
    let mut img = GrayImage::from_pixel(640, 480, Luma([30u8]));
    for y in 60..420 {
        for x in 80..560 {
            img.put_pixel(x, y, Luma([235u8]));
        }
    }
    RasterImage::from_gray_image(img).expect("non-empty frame")
}

fn page_quad() -> Quad {
    Quad::new([
        Point2D::new(80.0, 60.0),
        Point2D::new(560.0, 60.0),
        Point2D::new(560.0, 420.0),
        Point2D::new(80.0, 420.0),
    ])
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Steady-state detection: the detector is reused so its scratch buffers are
/// already sized, as in the live frame loop.
fn bench_detection(c: &mut Criterion) {
    let frame = preview_frame();
    let mut detector = EdgeContourDetector::default();

    c.bench_function("detect (640x480)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&frame))));
    });
}

fn bench_rectification(c: &mut Criterion) {
    let frame = preview_frame();
    let quad = page_quad();
    let rectifier = PerspectiveRectifier::new();

    c.bench_function("rectify (480x360 out)", |b| {
        b.iter(|| black_box(rectifier.rectify(black_box(&frame), &quad)));
    });
}

fn bench_filters(c: &mut Criterion) {
    let page = PerspectiveRectifier::new()
        .rectify(&preview_frame(), &page_quad())
        .expect("page rectifies");
    let enhancer = ImageEnhancer::default();

    for mode in [FilterMode::Enhance, FilterMode::BlackWhite, FilterMode::Grayscale] {
        c.bench_function(&format!("filter {mode} (480x360)"), |b| {
            b.iter(|| black_box(enhancer.apply(black_box(&page), mode)));
        });
    }
}

criterion_group!(benches, bench_detection, bench_rectification, bench_filters);
criterion_main!(benches);
