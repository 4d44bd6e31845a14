// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-vision — Image algorithms for the Docscan engine.
//
// Provides the raster container, quad geometry, per-frame document boundary
// detection, corner ordering, the stability state machine, perspective
// rectification, and the post-capture filters (enhance, grayscale, black & white).

pub mod detect;
pub mod enhance;
pub mod filter;
pub mod geometry;
pub mod order;
pub mod raster;
pub mod rectify;
pub mod stability;

// Re-export the primary structs so callers can use `docscan_vision::EdgeContourDetector` etc.
pub use detect::{DetectorParams, EdgeContourDetector, QuadCandidate};
pub use enhance::ImageEnhancer;
pub use order::order_corners;
pub use raster::RasterImage;
pub use rectify::{MAX_OUTPUT_PIXELS, PerspectiveRectifier};
pub use stability::{StabilityTracker, StabilityUpdate};
