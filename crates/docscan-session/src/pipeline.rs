// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One detection pass: detector -> corner ordering -> stability tracker.

use chrono::Utc;
use docscan_core::{DetectionSnapshot, ScannerConfig};
use docscan_vision::{EdgeContourDetector, RasterImage, StabilityTracker, order_corners};
use tracing::{instrument, trace};

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub snapshot: DetectionSnapshot,
    /// True on the frame that moved the tracker into `Locked`.
    pub lock_event: bool,
}

/// The synchronous per-frame work of the scan loop.
///
/// Owns the detector (and with it the scratch buffers) and the stability
/// tracker; creating a new pipeline is how a session restart forgets
/// everything from the previous run.
#[derive(Debug)]
pub struct FramePipeline {
    detector: EdgeContourDetector,
    tracker: StabilityTracker,
    sequence: u64,
}

impl FramePipeline {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            detector: EdgeContourDetector::from_config(config),
            tracker: StabilityTracker::from_config(config),
            sequence: 0,
        }
    }

    /// Frames processed since construction.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn tracker(&self) -> &StabilityTracker {
        &self.tracker
    }

    /// Detect, order and track one frame. Never fails.
    #[instrument(skip_all, fields(seq = self.sequence + 1))]
    pub fn process(&mut self, frame: &RasterImage) -> FrameOutcome {
        let quad = self
            .detector
            .detect(frame)
            .map(|candidate| order_corners(candidate.points));
        let update = self.tracker.observe(quad.as_ref());
        self.sequence += 1;

        trace!(found = quad.is_some(), state = ?update.state, "Frame processed");

        FrameOutcome {
            snapshot: DetectionSnapshot {
                quad,
                locked_frame_count: update.count,
                locked: update.locked,
                state: update.state,
                sequence: self.sequence,
                frame_width: frame.width(),
                frame_height: frame.height(),
                timestamp: Utc::now(),
            },
            lock_event: update.lock_event,
        }
    }

    /// Drop the stability history so the next lock needs fresh detections.
    pub fn reset_tracking(&mut self) {
        self.tracker.reset();
    }

    /// Free the detection scratch buffers.
    pub fn release(&mut self) {
        self.detector.release_scratch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::StabilityState;
    use image::{GrayImage, Luma};

    fn page_frame() -> RasterImage {
        let img = GrayImage::from_fn(320, 240, |x, y| {
            Luma([if (40..280).contains(&x) && (30..200).contains(&y) { 235 } else { 25 }])
        });
        RasterImage::from_gray_image(img).unwrap()
    }

    #[test]
    fn identical_frames_lock_at_threshold() {
        let config = ScannerConfig::default();
        let mut pipeline = FramePipeline::new(&config);
        let frame = page_frame();

        let outcomes: Vec<FrameOutcome> = (0..config.lock_threshold + 2).map(|_| pipeline.process(&frame)).collect();
        for (i, outcome) in outcomes.iter().enumerate() {
            let n = i as u32 + 1;
            assert!(outcome.snapshot.quad.is_some());
            assert_eq!(outcome.snapshot.sequence, u64::from(n));
            assert_eq!(outcome.snapshot.locked, n >= config.lock_threshold);
            assert_eq!(outcome.lock_event, n == config.lock_threshold);
        }
    }

    #[test]
    fn snapshot_carries_ordered_quad_and_frame_size() {
        let mut pipeline = FramePipeline::new(&ScannerConfig::default());
        let snapshot = pipeline.process(&page_frame()).snapshot;
        assert_eq!((snapshot.frame_width, snapshot.frame_height), (320, 240));
        let quad = snapshot.quad.unwrap();
        assert!(quad.top_left().x < quad.top_right().x);
        assert!(quad.top_left().y < quad.bottom_left().y);
    }

    #[test]
    fn blank_frame_unlocks() {
        let config = ScannerConfig {
            lock_threshold: 1,
            ..ScannerConfig::default()
        };
        let mut pipeline = FramePipeline::new(&config);
        assert!(pipeline.process(&page_frame()).snapshot.locked);

        let blank = RasterImage::from_luma(320, 240, vec![25; 320 * 240]).unwrap();
        let snapshot = pipeline.process(&blank).snapshot;
        assert!(!snapshot.locked);
        assert!(snapshot.quad.is_none());
        assert_eq!(snapshot.state, StabilityState::Searching);
    }

    #[test]
    fn reset_tracking_requires_fresh_lock() {
        let config = ScannerConfig {
            lock_threshold: 2,
            ..ScannerConfig::default()
        };
        let mut pipeline = FramePipeline::new(&config);
        let frame = page_frame();
        pipeline.process(&frame);
        assert!(pipeline.process(&frame).snapshot.locked);

        pipeline.reset_tracking();
        let outcome = pipeline.process(&frame);
        assert!(!outcome.snapshot.locked);
        assert_eq!(outcome.snapshot.state, StabilityState::Accumulating(1));
    }
}
