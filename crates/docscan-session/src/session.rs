// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live scan session — owns the frame loop task.
//
// The loop pulls the newest frame from its source, runs one synchronous
// detection pass, and replaces the published `LiveView` as a whole. Readers
// (overlay drawing, the capture path) only ever see complete values.
//
// Stopping signals the loop through a `Notify`, awaits the task and publishes
// an empty view, so nothing captured afterwards can use a stale frame. When
// the source ends by itself the last view stays readable. Starting again
// publishes an empty view and builds a fresh pipeline, so no corners,
// counters or scratch buffers survive a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use docscan_core::error::{DocscanError, Result};
use docscan_core::{DetectionSnapshot, Quad, ScannerConfig, SessionStatus};
use docscan_vision::{ImageEnhancer, RasterImage};
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::capture::CaptureHandle;
use crate::pipeline::FramePipeline;
use crate::source::FrameSource;

/// Capacity of the lock event channel; slow subscribers lose old events.
const LOCK_EVENT_CAPACITY: usize = 16;

/// The latest detection together with the frame it was computed from.
#[derive(Debug, Clone, Default)]
pub struct LiveView {
    pub snapshot: DetectionSnapshot,
    pub frame: Option<Arc<RasterImage>>,
}

/// Emitted once each time the tracker enters `Locked`.
#[derive(Debug, Clone, PartialEq)]
pub struct LockEvent {
    pub sequence: u64,
    pub quad: Quad,
    pub at: DateTime<Utc>,
}

/// State shared between the session handle and its loop task.
struct Shared {
    live: watch::Sender<LiveView>,
    lock_events: broadcast::Sender<LockEvent>,
    reset_requested: Arc<AtomicBool>,
    status: Mutex<SessionStatus>,
}

impl Shared {
    fn set_status(&self, status: SessionStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }
}

/// A live document scanning session.
///
/// Created `Stopped`. [`start`](Self::start) spawns the frame loop on the
/// current tokio runtime.
pub struct ScanSession {
    config: ScannerConfig,
    shared: Arc<Shared>,
    in_flight: Arc<AtomicBool>,
    enhancer: Arc<ImageEnhancer>,
    /// Replaced on every start so a stale permit cannot stop the next run.
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<Result<()>>>,
}

impl ScanSession {
    // -- Construction ---------------------------------------------------------

    /// Create a stopped session after validating `config`.
    pub fn new(config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        let (live, _) = watch::channel(LiveView::default());
        let (lock_events, _) = broadcast::channel(LOCK_EVENT_CAPACITY);
        let enhancer = Arc::new(ImageEnhancer::from_config(&config));
        Ok(Self {
            config,
            shared: Arc::new(Shared {
                live,
                lock_events,
                reset_requested: Arc::new(AtomicBool::new(false)),
                status: Mutex::new(SessionStatus::Stopped),
            }),
            in_flight: Arc::new(AtomicBool::new(false)),
            enhancer,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.shared
            .status
            .lock()
            .map(|s| *s)
            .unwrap_or(SessionStatus::Error)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> DetectionSnapshot {
        self.shared.live.borrow().snapshot.clone()
    }

    /// Receiver that is notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<LiveView> {
        self.shared.live.subscribe()
    }

    /// Receiver of lock transitions (for haptics or a capture sound).
    pub fn lock_events(&self) -> broadcast::Receiver<LockEvent> {
        self.shared.lock_events.subscribe()
    }

    pub fn capture_handle(&self) -> CaptureHandle {
        CaptureHandle::new(
            self.shared.live.subscribe(),
            Arc::clone(&self.in_flight),
            Arc::clone(&self.shared.reset_requested),
            Arc::clone(&self.enhancer),
        )
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Start the frame loop over `source`.
    ///
    /// # Errors
    ///
    /// `SessionAlreadyRunning` if a loop is still active.
    #[instrument(skip_all)]
    pub fn start<S: FrameSource>(&mut self, source: S) -> Result<()> {
        if self.task_handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(DocscanError::SessionAlreadyRunning);
        }
        // A finished task from the previous run is simply discarded.
        self.task_handle = None;

        self.shared.live.send_replace(LiveView::default());
        self.shared.reset_requested.store(false, Ordering::Release);
        self.shutdown_signal = Arc::new(Notify::new());
        self.shared.set_status(SessionStatus::Running);

        let pipeline = FramePipeline::new(&self.config);
        let shared = Arc::clone(&self.shared);
        let shutdown = Arc::clone(&self.shutdown_signal);
        self.task_handle = Some(tokio::spawn(frame_loop(source, pipeline, shared, shutdown)));

        info!(lock_threshold = self.config.lock_threshold, "Scan session started");
        Ok(())
    }

    /// Stop the loop, wait for it to exit and clear the published view.
    ///
    /// Returns the frame source error if the loop had already failed.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };
        info!("Stopping scan session");
        self.shutdown_signal.notify_one();
        let result = join(handle).await;
        self.shared.live.send_replace(LiveView::default());
        if result.is_ok() {
            self.shared.set_status(SessionStatus::Stopped);
        }
        info!("Scan session stopped");
        result
    }

    /// Wait until the source ends or fails, without signalling a stop.
    pub async fn wait(&mut self) -> Result<()> {
        match self.task_handle.take() {
            Some(handle) => join(handle).await,
            None => Ok(()),
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

async fn join(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle
        .await
        .map_err(|e| DocscanError::Session(format!("frame loop join: {e}")))?
}

/// The per-frame loop. Runs until shutdown, source end, or source failure.
async fn frame_loop<S: FrameSource>(
    mut source: S,
    mut pipeline: FramePipeline,
    shared: Arc<Shared>,
    shutdown: Arc<Notify>,
) -> Result<()> {
    let result = loop {
        let next = tokio::select! {
            _ = shutdown.notified() => {
                debug!(frames = pipeline.sequence(), "Frame loop received shutdown signal");
                break Ok(());
            }
            next = source.next_frame() => next,
        };

        match next {
            Ok(Some(frame)) => {
                if shared.reset_requested.swap(false, Ordering::AcqRel) {
                    debug!("Resetting stability after rejected capture");
                    pipeline.reset_tracking();
                }

                let outcome = pipeline.process(&frame);
                let lock_event = match (outcome.lock_event, outcome.snapshot.quad) {
                    (true, Some(quad)) => Some(LockEvent {
                        sequence: outcome.snapshot.sequence,
                        quad,
                        at: outcome.snapshot.timestamp,
                    }),
                    _ => None,
                };

                // Publish before announcing the lock, so a subscriber that
                // captures on the event reads the locked view.
                shared.live.send_replace(LiveView {
                    snapshot: outcome.snapshot,
                    frame: Some(frame),
                });
                if let Some(event) = lock_event {
                    // No subscribers is fine.
                    let _ = shared.lock_events.send(event);
                }

                // Detection is synchronous; let other tasks run between frames.
                tokio::task::yield_now().await;
            }
            Ok(None) => {
                info!(frames = pipeline.sequence(), "Frame source ended");
                break Ok(());
            }
            Err(err) => {
                error!(error = %err, "Frame source failed; ending session");
                break Err(err);
            }
        }
    };

    pipeline.release();
    match &result {
        Ok(()) => shared.set_status(SessionStatus::Stopped),
        Err(_) => shared.set_status(SessionStatus::Error),
    }
    if result.is_err() {
        warn!("Session requires a restart");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ReplaySource, latest_frame_channel};
    use docscan_core::{FilterMode, StabilityState};
    use image::{GrayImage, Luma};

    fn page_frame() -> RasterImage {
        let img = GrayImage::from_fn(320, 240, |x, y| {
            Luma([if (40..280).contains(&x) && (30..200).contains(&y) { 235 } else { 25 }])
        });
        RasterImage::from_gray_image(img).unwrap()
    }

    fn blank_frame() -> RasterImage {
        RasterImage::from_luma(320, 240, vec![25; 320 * 240]).unwrap()
    }

    #[tokio::test]
    async fn new_session_is_stopped_and_empty() {
        let session = ScanSession::new(ScannerConfig::default()).unwrap();
        assert_eq!(session.status(), SessionStatus::Stopped);
        assert_eq!(session.snapshot().sequence, 0);
        assert!(!session.snapshot().locked);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = ScannerConfig {
            lock_threshold: 0,
            ..ScannerConfig::default()
        };
        assert!(matches!(ScanSession::new(config), Err(DocscanError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn steady_feed_locks_and_captures() {
        let mut session = ScanSession::new(ScannerConfig::default()).unwrap();
        let mut locks = session.lock_events();
        session.start(ReplaySource::repeat(page_frame(), 6)).unwrap();
        session.wait().await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.sequence, 6);
        assert!(snapshot.locked);
        assert_eq!(snapshot.state, StabilityState::Locked);
        assert!(snapshot.overlay().capture_enabled);

        let event = locks.try_recv().unwrap();
        assert_eq!(event.sequence, 4);
        assert!(locks.try_recv().is_err());

        let doc = session.capture_handle().capture(FilterMode::Enhance).await.unwrap();
        let (w, h) = doc.image.dimensions();
        assert!((235..=250).contains(&w), "width {w}");
        assert!((165..=180).contains(&h), "height {h}");
    }

    #[tokio::test]
    async fn unlocked_session_refuses_capture() {
        let mut session = ScanSession::new(ScannerConfig::default()).unwrap();
        session.start(ReplaySource::repeat(blank_frame(), 3)).unwrap();
        session.wait().await.unwrap();
        let err = session.capture_handle().capture_latest(FilterMode::None).unwrap_err();
        assert!(matches!(err, DocscanError::NotLocked));
    }

    #[tokio::test]
    async fn source_failure_ends_session() {
        let mut session = ScanSession::new(ScannerConfig::default()).unwrap();
        let (publisher, source) = latest_frame_channel();
        session.start(source).unwrap();
        publisher.fail("camera permission denied");

        let err = session.wait().await.unwrap_err();
        assert!(matches!(err, DocscanError::FrameSource(_)));
        assert_eq!(session.status(), SessionStatus::Error);
    }

    #[tokio::test]
    async fn stop_cancels_waiting_loop() {
        let mut session = ScanSession::new(ScannerConfig::default()).unwrap();
        let (_publisher, source) = latest_frame_channel();
        session.start(source).unwrap();
        assert_eq!(session.status(), SessionStatus::Running);
        assert!(matches!(
            session.start(ReplaySource::new(Vec::new())),
            Err(DocscanError::SessionAlreadyRunning)
        ));

        session.stop().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lock_event_sees_locked_view() {
        let config = ScannerConfig {
            lock_threshold: 1,
            ..ScannerConfig::default()
        };
        let mut session = ScanSession::new(config).unwrap();
        let mut locks = session.lock_events();
        let (publisher, source) = latest_frame_channel();
        session.start(source).unwrap();

        publisher.publish(page_frame());
        let event = locks.recv().await.unwrap();
        assert!(session.snapshot().locked);
        assert!(session.snapshot().sequence >= event.sequence);
        assert!(session.capture_handle().capture_latest(FilterMode::None).is_ok());

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_clears_view_and_disables_capture() {
        let config = ScannerConfig {
            lock_threshold: 1,
            ..ScannerConfig::default()
        };
        let mut session = ScanSession::new(config).unwrap();
        let mut views = session.subscribe();
        let (publisher, source) = latest_frame_channel();
        session.start(source).unwrap();

        publisher.publish(page_frame());
        views.wait_for(|view| view.snapshot.locked).await.unwrap();

        session.stop().await.unwrap();
        assert!(!session.snapshot().locked);
        assert!(session.snapshot().quad.is_none());
        let err = session.capture_handle().capture_latest(FilterMode::None).unwrap_err();
        assert!(matches!(err, DocscanError::NotLocked));
    }

    #[tokio::test]
    async fn finished_source_keeps_last_view() {
        let config = ScannerConfig {
            lock_threshold: 2,
            ..ScannerConfig::default()
        };
        let mut session = ScanSession::new(config).unwrap();
        session.start(ReplaySource::repeat(page_frame(), 2)).unwrap();
        session.wait().await.unwrap();
        assert!(session.snapshot().locked);
        assert!(session.capture_handle().capture_latest(FilterMode::None).is_ok());
    }

    #[tokio::test]
    async fn restart_resets_snapshot() {
        let config = ScannerConfig {
            lock_threshold: 2,
            ..ScannerConfig::default()
        };
        let mut session = ScanSession::new(config).unwrap();
        session.start(ReplaySource::repeat(page_frame(), 3)).unwrap();
        session.wait().await.unwrap();
        assert!(session.snapshot().locked);

        let (publisher, source) = latest_frame_channel();
        session.start(source).unwrap();
        let snapshot = session.snapshot();
        assert!(!snapshot.locked);
        assert!(snapshot.quad.is_none());
        assert_eq!(snapshot.sequence, 0);

        // One frame after restart counts from one again.
        let mut views = session.subscribe();
        publisher.publish(page_frame());
        views.changed().await.unwrap();
        assert_eq!(views.borrow().snapshot.state, StabilityState::Accumulating(1));

        session.stop().await.unwrap();
    }
}
