// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docscan engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DocscanError;

/// A point in frame-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Four points approximating a document boundary.
///
/// Once produced by the corner orderer the corners are in canonical order:
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    corners: [Point2D; 4],
}

impl Quad {
    /// Wrap four corners. The caller is responsible for their order.
    pub const fn new(corners: [Point2D; 4]) -> Self {
        Self { corners }
    }

    /// Build a quad from corners given as percentages (0..=100) of the frame
    /// size, e.g. handles the user dragged on a preview.
    pub fn from_percent(corners: [(f64, f64); 4], frame_width: u32, frame_height: u32) -> Self {
        let w = f64::from(frame_width);
        let h = f64::from(frame_height);
        Self {
            corners: corners.map(|(px, py)| {
                Point2D::new(px.clamp(0.0, 100.0) / 100.0 * w, py.clamp(0.0, 100.0) / 100.0 * h)
            }),
        }
    }

    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> Point2D {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point2D {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.corners[3]
    }

    /// Scale every corner per axis (detection frame → capture frame).
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            corners: self.corners.map(|p| Point2D::new(p.x * sx, p.y * sy)),
        }
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// Post-rectification filter, selected per capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    None,
    Enhance,
    BlackWhite,
    Grayscale,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Enhance => "enhance",
            Self::BlackWhite => "blackwhite",
            Self::Grayscale => "grayscale",
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterMode {
    type Err = DocscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "original" => Ok(Self::None),
            "enhance" => Ok(Self::Enhance),
            "bw" | "blackwhite" | "black-white" => Ok(Self::BlackWhite),
            "gray" | "grayscale" | "greyscale" => Ok(Self::Grayscale),
            other => Err(DocscanError::InvalidConfig(format!("unknown filter mode: {other}"))),
        }
    }
}

/// Stability state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityState {
    /// No usable run of detections (counter 0).
    Searching,
    /// `n` consecutive stable detections, below the lock threshold.
    Accumulating(u32),
    /// Enough stable detections; capture is permitted.
    Locked,
}

/// One published detection result.
///
/// Replaced as a whole on every frame; readers never see a quad from one frame
/// paired with the lock flag of another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    /// Ordered quad detected in this frame, if any.
    pub quad: Option<Quad>,
    /// Consecutive stable frames counted so far.
    pub locked_frame_count: u32,
    /// Whether the tracker is in `Locked`.
    pub locked: bool,
    /// Tracker state after this frame.
    pub state: StabilityState,
    /// Monotonic frame counter within the session (0 = nothing processed yet).
    pub sequence: u64,
    /// Width of the frame the quad was detected in.
    pub frame_width: u32,
    /// Height of the frame the quad was detected in.
    pub frame_height: u32,
    pub timestamp: DateTime<Utc>,
}

impl DetectionSnapshot {
    /// The state before any frame has been processed.
    pub fn empty() -> Self {
        Self {
            quad: None,
            locked_frame_count: 0,
            locked: false,
            state: StabilityState::Searching,
            sequence: 0,
            frame_width: 0,
            frame_height: 0,
            timestamp: Utc::now(),
        }
    }

    /// Per-frame payload for overlay drawing and capture-button enablement.
    pub fn overlay(&self) -> Overlay {
        Overlay {
            quad: self.quad,
            locked: self.locked,
            capture_enabled: self.locked && self.quad.is_some(),
        }
    }
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// What the presentation layer needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub quad: Option<Quad>,
    pub locked: bool,
    pub capture_enabled: bool,
}

/// Lifecycle of a scan session's frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Stopped,
    Running,
    /// The frame source failed; the session must be restarted.
    Error,
}

/// Unique identifier for a captured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Framing presets shown as a guide over the live preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentPreset {
    /// No guide; free detection.
    #[default]
    Auto,
    A4,
    A5,
    /// National ID card (landscape).
    IdCard,
    /// Long thermal receipt.
    Receipt,
}

/// Axis-aligned rectangle in frame-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DocumentPreset {
    /// Height divided by width, or `None` for `Auto`.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match self {
            Self::Auto => None,
            Self::A4 | Self::A5 => Some(1.414),
            Self::IdCard => Some(0.63),
            Self::Receipt => Some(2.5),
        }
    }

    /// Largest rectangle with this preset's aspect ratio that fits in 85% of
    /// the frame, centred.
    pub fn guide_rect(&self, frame_width: u32, frame_height: u32) -> Option<GuideRect> {
        let ratio = self.aspect_ratio()?;
        if frame_width == 0 || frame_height == 0 {
            return None;
        }
        let max_w = f64::from(frame_width) * 0.85;
        let max_h = f64::from(frame_height) * 0.85;
        let (width, height) = if max_w * ratio <= max_h {
            (max_w, max_w * ratio)
        } else {
            (max_h / ratio, max_h)
        };
        Some(GuideRect {
            x: (f64::from(frame_width) - width) / 2.0,
            y: (f64::from(frame_height) - height) / 2.0,
            width,
            height,
        })
    }
}
