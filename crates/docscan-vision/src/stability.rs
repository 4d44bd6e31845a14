// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stability tracking — decides when consecutive detections agree closely
// enough to lock onto a document.
//
// Policy: the counter baseline is 0. A quad increments the counter when it is
// within tolerance of the previous frame's quad, or when there is no previous
// quad to compare against (the first detection after a reset counts as one).
// A quad that moves too far resets the counter to 0 and becomes the new
// reference; a frame without a quad resets the counter and forgets the
// reference.

use docscan_core::{Quad, ScannerConfig, StabilityState};
use tracing::{debug, info};

use crate::geometry::max_corner_deviation;

/// Result of feeding one frame to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityUpdate {
    pub state: StabilityState,
    /// Consecutive stable detections, including this frame.
    pub count: u32,
    pub locked: bool,
    /// True only on the frame that moved the tracker into `Locked`.
    pub lock_event: bool,
}

/// Counts consecutive stable quads and locks once the threshold is reached.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    tolerance_px: f64,
    threshold: u32,
    state: StabilityState,
    count: u32,
    previous: Option<Quad>,
}

impl StabilityTracker {
    /// `threshold` is clamped to at least 1.
    pub fn new(tolerance_px: f64, threshold: u32) -> Self {
        Self {
            tolerance_px,
            threshold: threshold.max(1),
            state: StabilityState::Searching,
            count: 0,
            previous: None,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.corner_stability_px, config.lock_threshold)
    }

    pub fn state(&self) -> StabilityState {
        self.state
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_locked(&self) -> bool {
        self.state == StabilityState::Locked
    }

    /// The quad later frames are compared against.
    pub fn reference(&self) -> Option<&Quad> {
        self.previous.as_ref()
    }

    /// True when every corner of `a` is within tolerance of the matching
    /// corner of `b` on both axes.
    pub fn is_stable(&self, a: &Quad, b: &Quad) -> bool {
        max_corner_deviation(a, b) <= self.tolerance_px
    }

    /// Feed one frame's ordered quad (or its absence).
    pub fn observe(&mut self, quad: Option<&Quad>) -> StabilityUpdate {
        let was_locked = self.is_locked();

        match quad {
            None => {
                if self.count > 0 || was_locked {
                    debug!(count = self.count, "Detection lost; searching");
                }
                self.count = 0;
                self.previous = None;
                self.state = StabilityState::Searching;
            }
            Some(quad) => {
                let stable = self.previous.as_ref().is_none_or(|prev| self.is_stable(prev, quad));
                if stable {
                    self.count = self.count.saturating_add(1);
                    self.state = if self.count >= self.threshold {
                        StabilityState::Locked
                    } else {
                        StabilityState::Accumulating(self.count)
                    };
                } else {
                    debug!(count = self.count, was_locked, "Quad moved; restarting count");
                    self.count = 0;
                    self.state = StabilityState::Searching;
                }
                self.previous = Some(*quad);
            }
        }

        let locked = self.is_locked();
        let lock_event = locked && !was_locked;
        if lock_event {
            info!(count = self.count, "Document locked");
        }

        StabilityUpdate {
            state: self.state,
            count: self.count,
            locked,
            lock_event,
        }
    }

    /// Back to `Searching` with no reference quad.
    pub fn reset(&mut self) {
        self.state = StabilityState::Searching;
        self.count = 0;
        self.previous = None;
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}
