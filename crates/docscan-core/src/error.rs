// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docscan.

use thiserror::Error;

/// Top-level error type for all Docscan operations.
#[derive(Debug, Error)]
pub enum DocscanError {
    // -- Geometry / imaging --
    #[error("degenerate document geometry: {0}")]
    DegenerateGeometry(String),

    #[error("invalid raster image: {0}")]
    InvalidImage(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Capture flow --
    #[error("document is not locked; capture is disabled")]
    NotLocked,

    #[error("a capture is already in progress")]
    CaptureInFlight,

    #[error("no frame is available for capture")]
    NoFrame,

    // -- Frame source / session --
    #[error("frame source failed: {0}")]
    FrameSource(String),

    #[error("scan session is already running")]
    SessionAlreadyRunning,

    #[error("scan session error: {0}")]
    Session(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocscanError>;
