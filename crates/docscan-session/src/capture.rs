// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture path — rectify and filter the latest locked detection, at most one
// capture at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use docscan_core::error::{DocscanError, Result};
use docscan_core::{CaptureId, FilterMode, Quad};
use docscan_vision::{ImageEnhancer, PerspectiveRectifier, RasterImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::session::LiveView;

/// A finished, rectified and filtered page.
#[derive(Debug, Clone)]
pub struct CapturedDocument {
    pub id: CaptureId,
    pub captured_at: DateTime<Utc>,
    pub filter: FilterMode,
    /// Quad used for rectification, in the captured frame's coordinates.
    pub quad: Quad,
    pub image: RasterImage,
    /// SHA-256 of the pixel buffer, hex encoded.
    pub digest: String,
}

/// What a presentation or export layer needs to describe a capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub id: CaptureId,
    pub captured_at: DateTime<Utc>,
    pub filter: FilterMode,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub digest: String,
}

impl CapturedDocument {
    /// Wrap a finished image, stamping it with a fresh id, the current time
    /// and the pixel digest.
    pub fn new(image: RasterImage, quad: Quad, filter: FilterMode) -> Self {
        let digest = hex::encode(Sha256::digest(image.as_bytes()));
        Self {
            id: CaptureId::new(),
            captured_at: Utc::now(),
            filter,
            quad,
            image,
            digest,
        }
    }

    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            id: self.id,
            captured_at: self.captured_at,
            filter: self.filter,
            width: self.image.width(),
            height: self.image.height(),
            channels: self.image.channels(),
            digest: self.digest.clone(),
        }
    }
}

/// Receives finished documents (gallery, file export, upload queue, ...).
pub trait DocumentSink {
    fn accept(&mut self, document: CapturedDocument) -> Result<()>;
}

impl DocumentSink for Vec<CapturedDocument> {
    fn accept(&mut self, document: CapturedDocument) -> Result<()> {
        self.push(document);
        Ok(())
    }
}

/// Marks a capture as running; cleared on drop, whatever the outcome.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    pub(crate) fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(DocscanError::CaptureInFlight);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Triggers captures against a running [`ScanSession`](crate::ScanSession).
///
/// Cheap to clone; all clones share the same in-flight flag, so only one
/// capture runs at a time across them.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    live: watch::Receiver<LiveView>,
    in_flight: Arc<AtomicBool>,
    reset_requested: Arc<AtomicBool>,
    rectifier: PerspectiveRectifier,
    enhancer: Arc<ImageEnhancer>,
}

impl CaptureHandle {
    pub(crate) fn new(
        live: watch::Receiver<LiveView>,
        in_flight: Arc<AtomicBool>,
        reset_requested: Arc<AtomicBool>,
        enhancer: Arc<ImageEnhancer>,
    ) -> Self {
        Self {
            live,
            in_flight,
            reset_requested,
            rectifier: PerspectiveRectifier::new(),
            enhancer,
        }
    }

    /// Whether a capture is running right now.
    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Capture from the frame the latest snapshot was detected in.
    pub fn capture_latest(&self, filter: FilterMode) -> Result<CapturedDocument> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.run(None, filter)
    }

    /// Capture from a separately taken (typically full-resolution) frame.
    ///
    /// The locked quad is scaled from the detection frame's size to this
    /// frame's size before rectification.
    pub fn capture_frame(&self, frame: &RasterImage, filter: FilterMode) -> Result<CapturedDocument> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.run(Some(frame), filter)
    }

    /// [`capture_latest`](Self::capture_latest) on the blocking thread pool,
    /// keeping the per-pixel work off the async workers.
    pub async fn capture(&self, filter: FilterMode) -> Result<CapturedDocument> {
        let guard = InFlightGuard::acquire(&self.in_flight)?;
        let handle = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            handle.run(None, filter)
        })
        .await
        .map_err(|e| DocscanError::Session(format!("capture task: {e}")))?
    }

    #[instrument(skip(self, frame), fields(explicit_frame = frame.is_some()))]
    fn run(&self, frame: Option<&RasterImage>, filter: FilterMode) -> Result<CapturedDocument> {
        // One clone of the published value: quad, lock flag and frame all
        // come from the same detection pass.
        let view = self.live.borrow().clone();
        let snapshot = &view.snapshot;

        if !snapshot.locked {
            debug!(state = ?snapshot.state, "Capture rejected; not locked");
            return Err(DocscanError::NotLocked);
        }
        let quad = snapshot.quad.ok_or(DocscanError::NotLocked)?;

        let (source, quad) = match frame {
            Some(frame) => {
                let quad = scale_quad(quad, (snapshot.frame_width, snapshot.frame_height), frame.dimensions());
                (frame, quad)
            }
            None => (view.frame.as_deref().ok_or(DocscanError::NoFrame)?, quad),
        };

        let rectified = match self.rectifier.rectify(source, &quad) {
            Ok(image) => image,
            Err(err @ DocscanError::DegenerateGeometry(_)) => {
                warn!(error = %err, "Capture geometry unusable; requesting fresh detection");
                self.reset_requested.store(true, Ordering::Release);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let image = self.enhancer.apply(&rectified, filter);
        let document = CapturedDocument::new(image, quad, filter);
        info!(
            id = %document.id,
            width = document.image.width(),
            height = document.image.height(),
            %filter,
            "Document captured"
        );
        Ok(document)
    }
}

/// Map `quad` from a `from`-sized frame onto a `to`-sized frame.
fn scale_quad(quad: Quad, from: (u32, u32), to: (u32, u32)) -> Quad {
    if from == to || from.0 == 0 || from.1 == 0 {
        return quad;
    }
    quad.scaled(
        f64::from(to.0) / f64::from(from.0),
        f64::from(to.1) / f64::from(from.1),
    )
}
