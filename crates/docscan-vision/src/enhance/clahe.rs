// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization (CLAHE).
//
// The image is split into a grid of tiles, each tile gets its own clipped
// equalization curve, and every pixel blends the curves of the four nearest
// tile centres so no tile seams show.

use image::GrayImage;

const BINS: usize = 256;

/// Equalize `gray` over a `tiles` x `tiles` grid with the given clip limit.
///
/// `clip_limit` is relative to a flat histogram: 1.0 allows no bin above the
/// average count, larger values allow more local contrast. The grid is
/// shrunk on images smaller than the tile count.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles_x = tiles.clamp(1, width.max(1));
    let tiles_y = tiles.clamp(1, height.max(1));
    let luts = build_luts(gray, clip_limit, tiles_x, tiles_y);

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let lut = |tx: u32, ty: u32, v: u8| f32::from(luts[(ty * tiles_x + tx) as usize][v as usize]);

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, wy) = neighbours(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, wx) = neighbours(x, tile_w, tiles_x);
            let v = gray.get_pixel(x, y).0[0];
            let top = lut(tx0, ty0, v) * (1.0 - wx) + lut(tx1, ty0, v) * wx;
            let bottom = lut(tx0, ty1, v) * (1.0 - wx) + lut(tx1, ty1, v) * wx;
            let blended = top * (1.0 - wy) + bottom * wy;
            output.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    output
}

/// The two tile indices whose centres bracket pixel `i` along one axis, and
/// the weight of the second one.
fn neighbours(i: u32, tile_len: f32, tiles: u32) -> (u32, u32, f32) {
    let pos = (i as f32 + 0.5) / tile_len - 0.5;
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let last = tiles - 1;
    let t0 = (pos.floor() as u32).min(last);
    let t1 = (t0 + 1).min(last);
    let weight = if t0 == t1 { 0.0 } else { pos - t0 as f32 };
    (t0, t1, weight)
}

/// One clipped equalization lookup table per tile, row-major.
fn build_luts(gray: &GrayImage, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> Vec<[u8; BINS]> {
    let (width, height) = gray.dimensions();
    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);

    for ty in 0..tiles_y {
        let y0 = ty * height / tiles_y;
        let y1 = (ty + 1) * height / tiles_y;
        for tx in 0..tiles_x {
            let x0 = tx * width / tiles_x;
            let x1 = (tx + 1) * width / tiles_x;

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            clip_histogram(&mut hist, clip_limit, area);
            luts.push(equalization_lut(&hist, area));
        }
    }
    luts
}

/// Cap every bin at `clip_limit * area / 256` and spread the excess evenly.
fn clip_histogram(hist: &mut [u32; BINS], clip_limit: f32, area: u32) {
    if clip_limit <= 0.0 || area == 0 {
        return;
    }
    let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}

fn equalization_lut(hist: &[u32; BINS], area: u32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    if area == 0 {
        return lut;
    }
    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
