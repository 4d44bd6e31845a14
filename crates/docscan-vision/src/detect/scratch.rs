// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-resolution scratch buffers for the detection pass.

use image::GrayImage;
use tracing::debug;

use super::canny::GradientScratch;

/// Intermediate buffers reused across frames of the same size.
///
/// Contents never carry meaning from one pass to the next: every stage
/// overwrites its buffer in full before reading it. Contour point lists are
/// not pooled; `find_contours` returns freshly allocated vectors.
#[derive(Debug, Default)]
pub struct ScratchPool {
    gray: GrayImage,
    blurred: GrayImage,
    row_pass: Vec<f32>,
    edges: GrayImage,
    gradients: GradientScratch,
    allocations: u64,
}

/// Mutable views handed to one detection pass.
pub(crate) struct ScratchBuffers<'a> {
    pub gray: &'a mut GrayImage,
    pub blurred: &'a mut GrayImage,
    pub row_pass: &'a mut Vec<f32>,
    pub edges: &'a mut GrayImage,
    pub gradients: &'a mut GradientScratch,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow buffers sized for a `width` x `height` frame, reallocating only
    /// when the resolution differs from the previous pass.
    pub(crate) fn buffers(&mut self, width: u32, height: u32) -> ScratchBuffers<'_> {
        if self.gray.dimensions() != (width, height) {
            debug!(
                from_w = self.gray.width(),
                from_h = self.gray.height(),
                width,
                height,
                "Resizing detection scratch buffers"
            );
            self.gray = GrayImage::new(width, height);
            self.blurred = GrayImage::new(width, height);
            let len = width as usize * height as usize;
            self.row_pass = Vec::with_capacity(len);
            self.edges = GrayImage::new(width, height);
            self.gradients = GradientScratch::with_capacity(len);
            self.allocations += 1;
        }
        ScratchBuffers {
            gray: &mut self.gray,
            blurred: &mut self.blurred,
            row_pass: &mut self.row_pass,
            edges: &mut self.edges,
            gradients: &mut self.gradients,
        }
    }

    /// Current buffer resolution, `(0, 0)` before the first pass.
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }

    /// How many times the buffers have been (re)allocated.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Drop all buffers.
    pub fn clear(&mut self) {
        *self = Self {
            allocations: self.allocations,
            ..Self::default()
        };
    }
}
