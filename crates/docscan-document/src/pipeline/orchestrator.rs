// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator — runs a recipe step by step against a vision engine
// and hands the final buffer back to the caller.

use docscan_core::error::{DocscanError, Result};
use docscan_core::{ProcessingMode, QualityScore, TierThresholds};
use tracing::{debug, info, instrument, warn};

use super::recipe::{Denoise, FilterStep, Recipe, select_recipe};
use crate::raster::RasterImage;
use crate::vision::VisionEngine;

/// Quality-adaptive, mode-selectable document clean-up.
///
/// Each step consumes the current buffer handle and produces the next one.
/// A superseded intermediate is released as soon as its successor exists; a
/// step that hands back its own input (a no-op) leaves the buffer alive.
#[derive(Debug, Clone)]
pub struct Pipeline<E> {
    engine: E,
    tiers: TierThresholds,
}

impl<E: VisionEngine> Pipeline<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            tiers: TierThresholds::default(),
        }
    }

    pub fn with_tiers(mut self, tiers: TierThresholds) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The recipe `process` would run for these inputs.
    pub fn plan(&self, mode: ProcessingMode, quality: Option<QualityScore>) -> Recipe {
        select_recipe(mode, quality, &self.tiers)
    }

    /// Clean up `image` for `mode`, adapting to `quality` when it is known.
    ///
    /// Fails with `InvalidArgument` for an image without pixels and with
    /// `ProcessingFailure` when any engine step fails. Nothing partial is
    /// returned on failure; the caller still holds whatever original it kept.
    #[instrument(
        skip(self, image),
        fields(width = image.width(), height = image.height(), quality = ?quality.map(|q| q.value()))
    )]
    pub fn process(
        &self,
        image: RasterImage,
        mode: ProcessingMode,
        quality: Option<QualityScore>,
    ) -> Result<RasterImage> {
        let recipe = self.plan(mode, quality);
        info!(%mode, steps = recipe.steps().len(), "Processing document");
        self.run_recipe(image, &recipe)
    }

    /// Run an explicit recipe.
    pub fn run_recipe(&self, image: RasterImage, recipe: &Recipe) -> Result<RasterImage> {
        if image.is_empty() {
            return Err(DocscanError::InvalidArgument(format!(
                "cannot process an image without pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let mut current = image;
        for step in recipe.steps() {
            let next = self.apply(step, &current).map_err(|err| {
                warn!(%step, error = %err, "Pipeline step failed");
                as_processing_failure(step, err)
            })?;

            if next.same_buffer(&current) {
                debug!(%step, "Step returned its input; buffer kept");
            } else {
                debug!(
                    %step,
                    width = next.width(),
                    height = next.height(),
                    "Step produced a new buffer; releasing the previous one"
                );
            }
            current = next;
        }

        info!(
            width = current.width(),
            height = current.height(),
            "Document processing complete"
        );
        Ok(current)
    }

    fn apply(&self, step: FilterStep, image: &RasterImage) -> Result<RasterImage> {
        match step {
            FilterStep::SeparateBackground => self.engine.separate_background(image),
            FilterStep::Grayscale => self.engine.to_grayscale(image),
            FilterStep::Denoise(level) => self.engine.denoise(image, level == Denoise::Advanced),
            FilterStep::EnhanceContrast => self.engine.enhance_contrast(image),
            FilterStep::Binarize(method) => self.engine.binarize(image, method),
        }
    }
}

/// Engine errors surface as a `ProcessingFailure` naming the step.
fn as_processing_failure(step: FilterStep, err: DocscanError) -> DocscanError {
    match err {
        failure @ DocscanError::ProcessingFailure { .. } => failure,
        other => DocscanError::processing(step.to_string(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ReleaseProbe;
    use crate::vision::ImageprocEngine;
    use docscan_core::{BinarizeMethod, Quadrilateral};
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use std::sync::Mutex;

    /// Vision engine double that records every call and keeps a weak probe on
    /// every buffer it allocates.
    #[derive(Default)]
    struct RecordingEngine {
        calls: Mutex<Vec<FilterStep>>,
        allocations: Mutex<Vec<ReleaseProbe>>,
        /// Step whose call returns the input handle unchanged.
        no_op: Option<FilterStep>,
        /// Step whose call fails.
        fail_on: Option<FilterStep>,
    }

    impl RecordingEngine {
        fn calls(&self) -> Vec<FilterStep> {
            self.calls.lock().unwrap().clone()
        }

        fn allocations(&self) -> Vec<ReleaseProbe> {
            self.allocations.lock().unwrap().clone()
        }

        fn record(&self, step: FilterStep, input: &RasterImage) -> Result<RasterImage> {
            self.calls.lock().unwrap().push(step);
            if self.fail_on == Some(step) {
                return Err(DocscanError::ImageError(format!("{step} exploded")));
            }
            if self.no_op == Some(step) {
                return Ok(input.clone());
            }
            let output = RasterImage::from_gray(GrayImage::new(input.width(), input.height()));
            self.allocations.lock().unwrap().push(output.probe());
            Ok(output)
        }
    }

    impl VisionEngine for RecordingEngine {
        fn detect_quadrilateral(&self, _image: &RasterImage) -> Result<Option<Quadrilateral>> {
            Ok(None)
        }

        fn perspective_crop(&self, image: &RasterImage, _quad: &Quadrilateral) -> Result<RasterImage> {
            Ok(image.clone())
        }

        fn to_grayscale(&self, image: &RasterImage) -> Result<RasterImage> {
            self.record(FilterStep::Grayscale, image)
        }

        fn denoise(&self, image: &RasterImage, advanced: bool) -> Result<RasterImage> {
            let level = if advanced { Denoise::Advanced } else { Denoise::Basic };
            self.record(FilterStep::Denoise(level), image)
        }

        fn enhance_contrast(&self, image: &RasterImage) -> Result<RasterImage> {
            self.record(FilterStep::EnhanceContrast, image)
        }

        fn binarize(&self, image: &RasterImage, method: BinarizeMethod) -> Result<RasterImage> {
            self.record(FilterStep::Binarize(method), image)
        }

        fn separate_background(&self, image: &RasterImage) -> Result<RasterImage> {
            self.record(FilterStep::SeparateBackground, image)
        }
    }

    fn photo() -> RasterImage {
        RasterImage::new(DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, 200])
        })))
    }

    #[test]
    fn printed_document_without_quality() {
        let pipeline = Pipeline::new(RecordingEngine::default());
        pipeline
            .process(photo(), ProcessingMode::PrintedDocument, None)
            .unwrap();
        assert_eq!(
            pipeline.engine().calls(),
            vec![
                FilterStep::Grayscale,
                FilterStep::Denoise(Denoise::Basic),
                FilterStep::EnhanceContrast,
                FilterStep::Binarize(BinarizeMethod::Otsu),
            ]
        );
    }

    #[test]
    fn low_and_high_quality_take_different_paths() {
        let low = Pipeline::new(RecordingEngine::default());
        low.process(photo(), ProcessingMode::PrintedDocument, Some(QualityScore::saturating(10)))
            .unwrap();
        let low_calls = low.engine().calls();

        let high = Pipeline::new(RecordingEngine::default());
        high.process(photo(), ProcessingMode::PrintedDocument, Some(QualityScore::saturating(90)))
            .unwrap();
        let high_calls = high.engine().calls();

        assert_ne!(low_calls, high_calls);
        let count = |calls: &[FilterStep], step: FilterStep| calls.iter().filter(|c| **c == step).count();
        assert_eq!(count(&low_calls, FilterStep::EnhanceContrast), 2);
        assert_eq!(count(&low_calls, FilterStep::SeparateBackground), 1);
        assert_eq!(count(&high_calls, FilterStep::EnhanceContrast), 0);
        assert_eq!(count(&high_calls, FilterStep::SeparateBackground), 0);
        assert_eq!(high_calls.last(), Some(&FilterStep::Binarize(BinarizeMethod::Otsu)));
    }

    #[test]
    fn intermediates_are_released_and_result_is_distinct() {
        let pipeline = Pipeline::new(RecordingEngine::default());
        let input = photo();
        let input_probe = input.probe();

        let result = pipeline
            .process(input, ProcessingMode::OcrOptimized, None)
            .unwrap();

        let allocations = pipeline.engine().allocations();
        let (last, intermediates) = allocations.split_last().unwrap();
        assert_eq!(intermediates.len(), 4);
        assert!(intermediates.iter().all(ReleaseProbe::is_released));
        assert!(!last.is_released());
        // The caller's input moved into the pipeline and is gone too.
        assert!(input_probe.is_released());

        drop(result);
        assert!(last.is_released());
    }

    #[test]
    fn no_op_step_keeps_its_buffer_alive() {
        let pipeline = Pipeline::new(RecordingEngine {
            no_op: Some(FilterStep::Grayscale),
            ..RecordingEngine::default()
        });
        let input = RasterImage::from_gray(GrayImage::from_pixel(32, 32, Luma([120])));
        let original = input.clone();

        let result = pipeline
            .process(input, ProcessingMode::PrintedDocument, None)
            .unwrap();

        // Grayscale handed the input back; denoise then allocated over it.
        assert_eq!(pipeline.engine().allocations().len(), 3);
        assert!(!result.same_buffer(&original));
        // The caller's own clone survives untouched.
        assert_eq!(original.to_luma8().get_pixel(0, 0).0[0], 120);
    }

    #[test]
    fn caller_clone_survives_for_fallback() {
        let pipeline = Pipeline::new(RecordingEngine {
            fail_on: Some(FilterStep::EnhanceContrast),
            ..RecordingEngine::default()
        });
        let original = photo();
        let err = pipeline
            .process(original.clone(), ProcessingMode::HandwrittenDocument, None)
            .unwrap_err();

        match err {
            DocscanError::ProcessingFailure { step, reason } => {
                assert_eq!(step, "enhance_contrast");
                assert!(reason.contains("exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(pipeline.engine().allocations().iter().all(ReleaseProbe::is_released));
        assert_eq!(original.dimensions(), (64, 48));
        // Binarize never ran.
        assert!(!pipeline.engine().calls().iter().any(|s| matches!(s, FilterStep::Binarize(_))));
    }

    #[test]
    fn empty_image_is_invalid() {
        let pipeline = Pipeline::new(RecordingEngine::default());
        let err = pipeline
            .process(RasterImage::from_gray(GrayImage::new(0, 0)), ProcessingMode::Advanced, None)
            .unwrap_err();
        assert!(matches!(err, DocscanError::InvalidArgument(_)));
        assert!(pipeline.engine().calls().is_empty());
    }

    #[test]
    fn custom_tiers_shift_the_override() {
        let pipeline = Pipeline::new(RecordingEngine::default())
            .with_tiers(TierThresholds { low: 50, high: 95 });
        let recipe = pipeline.plan(ProcessingMode::Whiteboard, Some(QualityScore::saturating(40)));
        assert_eq!(recipe.contrast_passes, 2);
        let recipe = pipeline.plan(ProcessingMode::Whiteboard, Some(QualityScore::saturating(90)));
        assert_eq!(recipe.contrast_passes, 1);
    }

    #[test]
    fn real_engine_produces_binary_output() {
        let pipeline = Pipeline::new(ImageprocEngine::new());
        let page = RasterImage::new(DynamicImage::ImageRgb8(RgbImage::from_fn(96, 96, |x, y| {
            if (30..66).contains(&x) && (44..52).contains(&y) {
                Rgb([25, 25, 40])
            } else {
                Rgb([230, 225, 210])
            }
        })));

        for mode in ProcessingMode::ALL {
            let out = pipeline.process(page.clone(), mode, None).unwrap();
            assert_eq!(out.dimensions(), (96, 96), "{mode}");
            let gray = out.to_luma8();
            assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255), "{mode}");
            assert_eq!(gray.get_pixel(5, 5).0[0], 255, "{mode} inked the margin");
        }
    }
}
