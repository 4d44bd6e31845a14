// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-session — Live scanning session for the Docscan engine.
//
// Drives the per-frame detection loop on tokio, publishes one immutable
// detection snapshot per frame, and runs the one-at-a-time capture path
// (rectify + filter) against the latest locked snapshot.

pub mod capture;
pub mod pipeline;
pub mod session;
pub mod source;

pub use capture::{CaptureHandle, CaptureSummary, CapturedDocument, DocumentSink};
pub use pipeline::{FrameOutcome, FramePipeline};
pub use session::{LiveView, LockEvent, ScanSession};
pub use source::{FramePublisher, FrameSource, LatestFrameSource, ReplaySource, latest_frame_channel};
