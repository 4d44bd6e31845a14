// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame sources — where the live loop gets its frames from.
//
// `latest_frame_channel` is the bridge for push-style cameras: the camera
// callback publishes into a single slot that always holds the newest frame,
// so a slow detection pass skips stale frames instead of queuing them.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use docscan_core::error::{DocscanError, Result};
use docscan_vision::RasterImage;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

/// Supplies frames to the scan loop at its own cadence.
///
/// `Ok(None)` means the source has ended normally. `Err` is an acquisition
/// failure (permission denied, device lost) and ends the session; the loop
/// does not retry.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Arc<RasterImage>>>> + Send;
}

// ---------------------------------------------------------------------------
// Latest-frame channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SourceEnd {
    Finished,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    /// Number of frames published so far; 0 = none yet.
    seq: u64,
    frame: Option<Arc<RasterImage>>,
    end: Option<SourceEnd>,
}

/// Producer half of [`latest_frame_channel`], held by the camera side.
#[derive(Debug)]
pub struct FramePublisher {
    tx: watch::Sender<Slot>,
}

/// Consumer half of [`latest_frame_channel`]; implements [`FrameSource`].
#[derive(Debug)]
pub struct LatestFrameSource {
    rx: watch::Receiver<Slot>,
    last_seq: u64,
    dropped: Arc<AtomicU64>,
}

/// Create a single-slot frame channel.
pub fn latest_frame_channel() -> (FramePublisher, LatestFrameSource) {
    let (tx, rx) = watch::channel(Slot::default());
    (
        FramePublisher { tx },
        LatestFrameSource {
            rx,
            last_seq: 0,
            dropped: Arc::new(AtomicU64::new(0)),
        },
    )
}

impl FramePublisher {
    /// Offer a frame, replacing any frame the loop has not picked up yet.
    pub fn publish(&self, frame: impl Into<Arc<RasterImage>>) {
        let frame = frame.into();
        self.tx.send_modify(|slot| {
            if slot.end.is_none() {
                slot.seq += 1;
                slot.frame = Some(frame);
            }
        });
    }

    /// Report a fatal acquisition failure.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "Frame source failed");
        self.tx.send_modify(|slot| slot.end = Some(SourceEnd::Failed(reason)));
    }

    /// End the stream; a frame not yet consumed is still delivered.
    pub fn finish(&self) {
        self.tx.send_modify(|slot| {
            if slot.end.is_none() {
                slot.end = Some(SourceEnd::Finished);
            }
        });
    }

    /// Frames published so far.
    pub fn published(&self) -> u64 {
        self.tx.borrow().seq
    }
}

impl LatestFrameSource {
    /// Frames that were overwritten before the loop got to them.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared counter, readable after the source has moved into a session.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl FrameSource for LatestFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Arc<RasterImage>>> {
        loop {
            let (seq, frame, end) = {
                let slot = self.rx.borrow_and_update();
                (slot.seq, slot.frame.clone(), slot.end.clone())
            };

            if let Some(SourceEnd::Failed(reason)) = end {
                return Err(DocscanError::FrameSource(reason));
            }
            if seq > self.last_seq {
                if let Some(frame) = frame {
                    let skipped = seq - self.last_seq - 1;
                    if skipped > 0 {
                        self.dropped.fetch_add(skipped, Ordering::Relaxed);
                        trace!(skipped, "Dropped stale frames");
                    }
                    self.last_seq = seq;
                    return Ok(Some(frame));
                }
            }
            if matches!(end, Some(SourceEnd::Finished)) {
                debug!(frames = self.last_seq, "Frame channel finished");
                return Ok(None);
            }

            if self.rx.changed().await.is_err() {
                // Publisher dropped without finishing.
                debug!("Frame publisher went away");
                return Ok(None);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Plays back a fixed list of frames, optionally paced like a camera.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: VecDeque<Arc<RasterImage>>,
    interval: Option<Duration>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = Arc<RasterImage>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            interval: None,
        }
    }

    /// The same frame `count` times, as from a camera held perfectly still.
    pub fn repeat(frame: impl Into<Arc<RasterImage>>, count: usize) -> Self {
        let frame = frame.into();
        Self::new(std::iter::repeat_n(frame, count))
    }

    /// Wait `interval` before delivering each frame.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<Arc<RasterImage>>> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        if let Some(interval) = self.interval {
            tokio::time::sleep(interval).await;
        }
        Ok(self.frames.pop_front())
    }
}
