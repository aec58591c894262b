// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-frame processing — detect, crop, score, clean up, or fall back to the
// untouched frame.

use docscan_core::error::{DocscanError, Recovery, Result};
use docscan_core::{ProcessingMode, Quadrilateral, QualityScore, ScanConfig};
use docscan_document::{Pipeline, QualityEstimator, RasterImage, VisionEngine, normalize};
use tracing::{debug, info, instrument, warn};

/// Result of processing one accepted frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The pipeline ran to completion.
    Processed {
        image: RasterImage,
        /// Normalized boundary the frame was cropped to, if one was found.
        quad: Option<Quadrilateral>,
        quality: QualityScore,
    },
    /// Processing failed; the frame is kept exactly as captured.
    FellBack {
        original: RasterImage,
        error: DocscanError,
    },
}

impl FrameOutcome {
    /// The image to store, processed or not.
    pub fn image(&self) -> &RasterImage {
        match self {
            Self::Processed { image, .. } => image,
            Self::FellBack { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FellBack { .. })
    }
}

/// Turns a captured frame into a cleaned-up document image.
pub struct FrameProcessor<E> {
    pipeline: Pipeline<E>,
    estimator: QualityEstimator,
    mode: ProcessingMode,
    crop: bool,
}

impl<E: VisionEngine> FrameProcessor<E> {
    pub fn new(engine: E, config: &ScanConfig) -> Self {
        Self {
            pipeline: Pipeline::new(engine).with_tiers(config.tier_thresholds),
            estimator: QualityEstimator::new(config.quality_policy.clone()),
            mode: config.default_mode,
            crop: config.crop_detected_quad,
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn pipeline(&self) -> &Pipeline<E> {
        &self.pipeline
    }

    /// Process `frame`, falling back to it unchanged when a vision step or
    /// decode fails.
    ///
    /// Errors that a fallback cannot paper over (bad input, I/O) are
    /// returned instead.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height(), mode = %self.mode))]
    pub fn run(&self, frame: RasterImage) -> Result<FrameOutcome> {
        match self.try_run(&frame) {
            Ok(outcome) => Ok(outcome),
            Err(error) if error.recovery() == Recovery::UseOriginal => {
                warn!(error = %error, "Processing failed; keeping the original frame");
                Ok(FrameOutcome::FellBack {
                    original: frame,
                    error,
                })
            }
            Err(error) => Err(error),
        }
    }

    fn try_run(&self, frame: &RasterImage) -> Result<FrameOutcome> {
        if frame.is_empty() {
            return Err(DocscanError::InvalidArgument(
                "captured frame has no pixels".into(),
            ));
        }

        let engine = self.pipeline.engine();
        let (cropped, quad) = if self.crop {
            match engine.detect_quadrilateral(frame)? {
                Some(found) => {
                    let quad = normalize(found.points())?;
                    debug!(corners = ?quad.points(), "Cropping to detected boundary");
                    (engine.perspective_crop(frame, &quad)?, Some(quad))
                }
                None => {
                    debug!("No document boundary; processing the full frame");
                    (frame.clone(), None)
                }
            }
        } else {
            (frame.clone(), None)
        };

        let quality = self.estimator.estimate(&cropped);
        let image = self.pipeline.process(cropped, self.mode, Some(quality))?;
        info!(
            quality = quality.value(),
            cropped = quad.is_some(),
            width = image.width(),
            height = image.height(),
            "Frame processed"
        );
        Ok(FrameOutcome::Processed {
            image,
            quad,
            quality,
        })
    }
}
