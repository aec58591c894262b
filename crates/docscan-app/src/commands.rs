// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations for the docscan binary.

use std::path::{Path, PathBuf};

use docscan_capture::{
    CaptureLoop, CapturedFrame, DirectoryFrameSource, FrameProcessor, downscale_preview,
};
use docscan_core::error::{DocscanError, Recovery, Result};
use docscan_core::{ProcessingMode, Quadrilateral, QualityScore, ScanConfig};
use docscan_document::{
    FilterStep, ImageprocEngine, Pipeline, QualityEstimator, RasterImage, Recipe, VisionEngine,
    normalize, similarity,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Read `path` if given, otherwise use the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(path) => {
            let config = ScanConfig::load(path)?;
            info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => Ok(ScanConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// -- process ------------------------------------------------------------------

pub struct ProcessArgs<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub mode: Option<ProcessingMode>,
    pub quality: Option<u8>,
    pub auto_quality: bool,
    pub crop: bool,
}

#[derive(Debug, Serialize)]
struct ProcessReport {
    mode: ProcessingMode,
    quality: Option<QualityScore>,
    cropped_to: Option<Quadrilateral>,
    recipe: Recipe,
    steps: Vec<FilterStep>,
    fallback: bool,
    width: u32,
    height: u32,
}

pub fn process(config: &ScanConfig, args: ProcessArgs<'_>) -> Result<()> {
    let engine = ImageprocEngine::new();
    let mode = args.mode.unwrap_or(config.default_mode);
    let original = RasterImage::open(args.input)?;

    let (page, quad) = if args.crop && config.crop_detected_quad {
        crop_to_document(&engine, &original)?
    } else {
        (original.clone(), None)
    };

    let quality = match args.quality {
        Some(value) => Some(QualityScore::saturating(value as i64)),
        None if args.auto_quality => {
            Some(QualityEstimator::new(config.quality_policy.clone()).estimate(&page))
        }
        None => None,
    };

    let pipeline = Pipeline::new(&engine).with_tiers(config.tier_thresholds);
    let recipe = pipeline.plan(mode, quality);
    let steps = recipe.steps();
    debug!(?steps, "Recipe selected");

    let (result, fallback) = match pipeline.process(page, mode, quality) {
        Ok(image) => (image, false),
        Err(e) if e.recovery() == Recovery::UseOriginal => {
            warn!(error = %e, "Processing failed; writing the original image");
            (original, true)
        }
        Err(e) => return Err(e),
    };
    result.save(args.output)?;
    info!(output = %args.output.display(), fallback, "Page written");

    print_json(&ProcessReport {
        mode,
        quality,
        cropped_to: quad,
        recipe,
        steps,
        fallback,
        width: result.width(),
        height: result.height(),
    })
}

/// Detect the page boundary and crop to it, or keep the whole image.
fn crop_to_document<E: VisionEngine>(
    engine: &E,
    image: &RasterImage,
) -> Result<(RasterImage, Option<Quadrilateral>)> {
    let Some(found) = engine.detect_quadrilateral(image)? else {
        debug!("No document boundary detected");
        return Ok((image.clone(), None));
    };
    let quad = normalize(found.points())?;
    Ok((engine.perspective_crop(image, &quad)?, Some(quad)))
}

// -- compare ------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompareReport {
    structural: f64,
    histogram: f64,
    combined: f64,
    threshold: f64,
    duplicate: bool,
}

pub fn compare(config: &ScanConfig, a: &Path, b: &Path, downscale: Option<u32>) -> Result<()> {
    let factor = downscale.unwrap_or(config.preview_downscale);
    let a = downscale_preview(&RasterImage::open(a)?, factor);
    let b = downscale_preview(&RasterImage::open(b)?, factor);

    let score = similarity(Some(&a), Some(&b));
    print_json(&CompareReport {
        structural: score.structural,
        histogram: score.histogram,
        combined: score.combined,
        threshold: config.similarity_threshold,
        duplicate: score.exceeds(config.similarity_threshold),
    })
}

// -- watch --------------------------------------------------------------------

pub async fn watch(
    config: &ScanConfig,
    frames: &Path,
    out_dir: &Path,
    mode: Option<ProcessingMode>,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    let source = DirectoryFrameSource::open(frames)?;

    let processor = FrameProcessor::new(ImageprocEngine::new(), config)
        .with_mode(mode.unwrap_or(config.default_mode));
    let capture = CaptureLoop::new(processor, config);

    let (tx, mut rx) = mpsc::channel::<CapturedFrame>(8);
    let (active_tx, active_rx) = tokio::sync::watch::channel(true);

    let capture_task = tokio::spawn(async move { capture.run(source, tx, active_rx).await });
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; stopping capture");
            let _ = active_tx.send(false);
        }
    });

    let mut written = 0u64;
    while let Some(frame) = rx.recv().await {
        let path = output_path(out_dir, &frame);
        frame.outcome.image().save(&path)?;
        written += 1;
        info!(
            sequence = frame.sequence,
            path = %path.display(),
            fallback = frame.outcome.is_fallback(),
            "Page written"
        );
    }

    let stats = capture_task
        .await
        .map_err(|e| DocscanError::processing("capture_loop", format!("task join: {e}")))??;
    info!(written, "Watch finished");
    print_json(&stats)
}

/// `<out_dir>/<label>.png`, or a numbered name when the source has no label.
fn output_path(out_dir: &Path, frame: &CapturedFrame) -> PathBuf {
    let stem = frame
        .label
        .clone()
        .unwrap_or_else(|| format!("frame-{:05}", frame.sequence));
    out_dir.join(format!("{stem}.png"))
}
