// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-capture loop -- one capture cycle per interval, never two at once.
//
// Each cycle pulls a frame, checks it against the session's reference
// preview, and processes it if it is new. The CPU work runs on tokio's
// blocking pool. The frame source and session are moved into the blocking
// task and handed back with its result, so the next cycle cannot start until
// the previous one has finished.
//
// # Cancellation
//
// The loop watches an `active` flag. It is checked before each cycle is
// scheduled and again before a finished cycle's result is delivered; a
// cycle already running on the blocking pool is allowed to finish but its
// output is dropped.

use std::sync::Arc;
use std::time::Duration;

use docscan_core::ScanConfig;
use docscan_core::error::{DocscanError, Recovery, Result};
use docscan_document::VisionEngine;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::processor::{FrameOutcome, FrameProcessor};
use crate::session::{CaptureSession, CaptureStats, FrameDecision, downscale_preview};
use crate::source::FrameSource;

// ---------------------------------------------------------------------------
// Delivered results
// ---------------------------------------------------------------------------

/// A frame that made it past duplicate suppression.
#[derive(Debug)]
pub struct CapturedFrame {
    /// 1-based position of the frame in the source, counting skipped frames.
    pub sequence: u64,
    /// Source-supplied name for the frame, if any.
    pub label: Option<String>,
    pub decision: FrameDecision,
    pub outcome: FrameOutcome,
}

/// What a single cycle did.
enum CycleStep {
    Exhausted,
    Skipped,
    Unreadable,
    Captured(CapturedFrame),
}

/// State threaded through consecutive cycles.
struct Cycle<S> {
    source: S,
    session: CaptureSession,
    sequence: u64,
}

impl<S: FrameSource> Cycle<S> {
    fn step<E: VisionEngine>(&mut self, processor: &FrameProcessor<E>, downscale: u32) -> Result<CycleStep> {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(CycleStep::Exhausted),
            Err(err) if err.recovery() == Recovery::UseOriginal => {
                warn!(error = %err, "Unreadable frame; waiting for the next one");
                return Ok(CycleStep::Unreadable);
            }
            Err(err) => return Err(err),
        };
        self.sequence += 1;

        let decision = self.session.observe(downscale_preview(&frame, downscale));
        if !decision.should_process() {
            // The frame is dropped here; only its preview was ever compared.
            return Ok(CycleStep::Skipped);
        }

        let outcome = processor.run(frame)?;
        if outcome.is_fallback() {
            self.session.record_failure();
        }
        Ok(CycleStep::Captured(CapturedFrame {
            sequence: self.sequence,
            label: self.source.last_label().map(str::to_owned),
            decision,
            outcome,
        }))
    }
}

// ---------------------------------------------------------------------------
// CaptureLoop
// ---------------------------------------------------------------------------

/// Periodic, single-flight auto-capture.
pub struct CaptureLoop<E> {
    processor: Arc<FrameProcessor<E>>,
    interval: Duration,
    downscale: u32,
    threshold: f64,
}

impl<E: VisionEngine + 'static> CaptureLoop<E> {
    pub fn new(processor: FrameProcessor<E>, config: &ScanConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            interval: config.capture_interval(),
            downscale: config.preview_downscale,
            threshold: config.similarity_threshold,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Capture from `source` until it is exhausted or `active` turns false.
    ///
    /// Accepted frames are sent to `sink` in source order. Returns the
    /// session's final counters. Fails with `SessionClosed` if the receiving
    /// end of `sink` goes away, and with any error a cycle could not absorb.
    #[instrument(skip_all, fields(interval_ms = self.interval.as_millis() as u64, downscale = self.downscale))]
    pub async fn run<S>(
        &self,
        source: S,
        sink: mpsc::Sender<CapturedFrame>,
        mut active: watch::Receiver<bool>,
    ) -> Result<CaptureStats>
    where
        S: FrameSource + 'static,
    {
        let mut cycle = Cycle {
            source,
            session: CaptureSession::new(self.threshold),
            sequence: 0,
        };

        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Capture loop started");
        loop {
            if !*active.borrow() {
                debug!("Capture loop deactivated");
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = active.changed() => {
                    if changed.is_err() {
                        debug!("Active flag sender dropped");
                        break;
                    }
                    continue;
                }
            }
            if !*active.borrow() {
                break;
            }

            let processor = Arc::clone(&self.processor);
            let downscale = self.downscale;
            let (returned, step) = tokio::task::spawn_blocking(move || {
                let step = cycle.step(&processor, downscale);
                (cycle, step)
            })
            .await
            .map_err(|e| DocscanError::processing("capture_cycle", format!("task join: {e}")))?;
            cycle = returned;

            match step? {
                CycleStep::Exhausted => {
                    info!("Frame source exhausted");
                    break;
                }
                CycleStep::Skipped | CycleStep::Unreadable => {}
                CycleStep::Captured(frame) => {
                    if !*active.borrow() {
                        debug!(sequence = frame.sequence, "Deactivated mid-cycle; result discarded");
                        break;
                    }
                    debug!(
                        sequence = frame.sequence,
                        fallback = frame.outcome.is_fallback(),
                        "Delivering captured frame"
                    );
                    if sink.send(frame).await.is_err() {
                        warn!("Capture sink closed");
                        return Err(DocscanError::SessionClosed);
                    }
                }
            }
        }

        let stats = cycle.session.stats();
        info!(
            observed = stats.observed,
            skipped = stats.skipped,
            captured = stats.captured,
            failed = stats.failed,
            "Capture loop stopped"
        );
        Ok(stats)
    }
}
