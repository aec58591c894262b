// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture session — duplicate suppression against the last accepted frame.

use docscan_core::{ScanConfig, SimilarityScore};
use docscan_document::{RasterImage, ReleaseProbe, similarity};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Coarse preview used for similarity checks, `factor` times smaller on each
/// axis than the captured frame.
pub fn downscale_preview(image: &RasterImage, factor: u32) -> RasterImage {
    image.downscaled(factor)
}

/// What the session decided about one preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameDecision {
    /// No reference yet; this frame became the reference.
    Primed,
    /// Too similar to the reference; drop the frame.
    Skip(SimilarityScore),
    /// Different enough to process. The frame replaced the reference unless
    /// its preview had no pixels.
    Accept(SimilarityScore),
}

impl FrameDecision {
    /// Primed and accepted frames go on to processing.
    pub fn should_process(&self) -> bool {
        !matches!(self, Self::Skip(_))
    }

    pub fn score(&self) -> Option<SimilarityScore> {
        match self {
            Self::Primed => None,
            Self::Skip(score) | Self::Accept(score) => Some(*score),
        }
    }
}

/// Running counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub observed: u64,
    /// Frames handed on for processing (including the priming frame).
    pub captured: u64,
    pub skipped: u64,
    /// Captured frames whose processing fell back to the original.
    pub failed: u64,
}

/// Holds the reference preview between capture cycles.
///
/// The reference is replaced only when a frame is judged non-similar, and is
/// released by `reset` or when the session is dropped.
#[derive(Debug)]
pub struct CaptureSession {
    reference: Option<RasterImage>,
    threshold: f64,
    stats: CaptureStats,
}

impl CaptureSession {
    pub fn new(threshold: f64) -> Self {
        Self {
            reference: None,
            threshold,
            stats: CaptureStats::default(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.similarity_threshold)
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Observer for the current reference buffer.
    pub fn reference_probe(&self) -> Option<ReleaseProbe> {
        self.reference.as_ref().map(RasterImage::probe)
    }

    /// Compare `preview` with the reference and keep it if it is new.
    pub fn observe(&mut self, preview: RasterImage) -> FrameDecision {
        self.stats.observed += 1;

        // An empty preview says nothing about the scene; keep comparing later
        // frames against the last real reference.
        if preview.is_empty() {
            self.stats.captured += 1;
            warn!(
                width = preview.width(),
                height = preview.height(),
                "Empty preview; reference kept"
            );
            return FrameDecision::Accept(SimilarityScore::ZERO);
        }

        let Some(reference) = self.reference.as_ref() else {
            self.reference = Some(preview);
            self.stats.captured += 1;
            info!("First frame; reference primed");
            return FrameDecision::Primed;
        };

        let score = similarity(Some(reference), Some(&preview));
        debug!(
            structural = score.structural,
            histogram = score.histogram,
            combined = score.combined,
            threshold = self.threshold,
            "Preview compared with reference"
        );

        if score.exceeds(self.threshold) {
            self.stats.skipped += 1;
            info!(score = score.combined, skipped = self.stats.skipped, "Similar frame skipped");
            FrameDecision::Skip(score)
        } else {
            self.reference = Some(preview);
            self.stats.captured += 1;
            info!(score = score.combined, captured = self.stats.captured, "New frame accepted");
            FrameDecision::Accept(score)
        }
    }

    /// Count a captured frame whose processing fell back to the original.
    pub fn record_failure(&mut self) {
        self.stats.failed += 1;
    }

    /// Release the reference and zero the counters.
    pub fn reset(&mut self) {
        self.reference = None;
        self.stats = CaptureStats::default();
        debug!("Capture session reset");
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}
