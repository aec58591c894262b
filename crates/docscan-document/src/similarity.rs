// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame similarity — decides whether a freshly captured frame repeats the
// previous one. Combines a sampled SSIM-style structural score with a blend of
// luma-histogram distances.
//
// Callers are expected to pass frames that were already shrunk to roughly a
// quarter of their linear capture resolution (see `RasterImage::downscaled`).

use docscan_core::SimilarityScore;
use tracing::{debug, instrument, trace};

use crate::raster::RasterImage;

/// SSIM stabilising constants for 8-bit data.
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Fewer structural samples than this yields a structural score of 0.
pub const MIN_STRUCTURAL_SAMPLES: u64 = 10;

/// Luma histogram resolution.
pub const HISTOGRAM_BINS: usize = 64;

/// Slope of the logistic curve applied to the raw structural score.
const SHARPENING: f64 = 10.0;

const STRUCTURAL_WEIGHT: f64 = 0.7;
const HISTOGRAM_WEIGHT: f64 = 0.3;

const BHATTACHARYYA_WEIGHT: f64 = 0.4;
const CORRELATION_WEIGHT: f64 = 0.35;
const INTERSECTION_WEIGHT: f64 = 0.25;

/// Compare two frames.
///
/// Returns [`SimilarityScore::ZERO`] when either frame is absent or when the
/// overlapping region (`min` width by `min` height) has no pixels. Only the
/// overlap is compared, anchored at the top-left corner. The result is
/// symmetric in its arguments and every component lies in [0, 1].
#[instrument(skip_all)]
pub fn similarity(
    reference: Option<&RasterImage>,
    candidate: Option<&RasterImage>,
) -> SimilarityScore {
    let (Some(reference), Some(candidate)) = (reference, candidate) else {
        debug!("Similarity requested with an absent frame");
        return SimilarityScore::ZERO;
    };

    let width = reference.width().min(candidate.width());
    let height = reference.height().min(candidate.height());
    if width == 0 || height == 0 {
        debug!(width, height, "Frames do not overlap");
        return SimilarityScore::ZERO;
    }

    let structural = finite_or_zero(structural_similarity(reference, candidate, width, height));
    let histogram = finite_or_zero(histogram_similarity(reference, candidate, width, height));
    let combined =
        finite_or_zero(STRUCTURAL_WEIGHT * structural + HISTOGRAM_WEIGHT * histogram).clamp(0.0, 1.0);

    debug!(structural, histogram, combined, "Frame similarity computed");
    SimilarityScore {
        structural,
        histogram,
        combined,
    }
}

/// Anything that is not a finite number counts as "not similar".
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// BT.601 luma.
fn luma([r, g, b]: [u8; 3]) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

// -- Sampling -----------------------------------------------------------------

/// Grid sampling parameters derived from the overlap size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    /// Distance between samples inside a block.
    pub step: u32,
    /// Side length of the square blocks that tile the overlap.
    pub block: u32,
}

impl SamplingPlan {
    pub fn for_overlap(width: u32, height: u32) -> Self {
        let min_dimension = width.min(height);
        let step = match min_dimension {
            0..=100 => 1,
            101..=300 => 2,
            _ => (min_dimension / 150).max(2),
        };
        Self {
            step,
            block: (4 * step).max(8),
        }
    }

    /// Visit every sample coordinate, block by block. Each block restarts its
    /// own grid so every region contributes even when the overlap is not a
    /// multiple of the step.
    fn for_each(&self, width: u32, height: u32, mut visit: impl FnMut(u32, u32)) {
        for block_y in (0..height).step_by(self.block as usize) {
            let y_end = (block_y + self.block).min(height);
            for block_x in (0..width).step_by(self.block as usize) {
                let x_end = (block_x + self.block).min(width);
                for y in (block_y..y_end).step_by(self.step as usize) {
                    for x in (block_x..x_end).step_by(self.step as usize) {
                        visit(x, y);
                    }
                }
            }
        }
    }
}

// -- Structural similarity ----------------------------------------------------

/// Running moments of two paired luma sequences.
#[derive(Debug, Default)]
struct PairedMoments {
    count: u64,
    sum_a: f64,
    sum_b: f64,
    sum_aa: f64,
    sum_bb: f64,
    sum_ab: f64,
}

impl PairedMoments {
    fn push(&mut self, a: f64, b: f64) {
        self.count += 1;
        self.sum_a += a;
        self.sum_b += b;
        self.sum_aa += a * a;
        self.sum_bb += b * b;
        self.sum_ab += a * b;
    }

    /// (mean_a, mean_b, var_a, var_b, covariance). Variances are clamped at 0
    /// to absorb rounding.
    fn statistics(&self) -> (f64, f64, f64, f64, f64) {
        let n = self.count as f64;
        let mean_a = self.sum_a / n;
        let mean_b = self.sum_b / n;
        let var_a = (self.sum_aa / n - mean_a * mean_a).max(0.0);
        let var_b = (self.sum_bb / n - mean_b * mean_b).max(0.0);
        let covariance = self.sum_ab / n - mean_a * mean_b;
        (mean_a, mean_b, var_a, var_b, covariance)
    }
}

/// Sharpened global SSIM over the sampled overlap of `a` and `b`.
///
/// `width` and `height` describe the overlap and must not exceed either
/// image.
pub fn structural_similarity(a: &RasterImage, b: &RasterImage, width: u32, height: u32) -> f64 {
    let plan = SamplingPlan::for_overlap(width, height);
    let mut moments = PairedMoments::default();
    plan.for_each(width, height, |x, y| {
        moments.push(luma(a.rgb_at(x, y)), luma(b.rgb_at(x, y)));
    });

    if moments.count < MIN_STRUCTURAL_SAMPLES {
        debug!(samples = moments.count, "Too few samples for structural score");
        return 0.0;
    }

    let (mean_a, mean_b, var_a, var_b, covariance) = moments.statistics();
    let sigma_product = (var_a * var_b).sqrt();

    let luminance = (2.0 * mean_a * mean_b + C1) / (mean_a * mean_a + mean_b * mean_b + C1);
    let contrast = (2.0 * sigma_product + C2) / (var_a + var_b + C2);
    let structure = (covariance + C2 / 2.0) / (sigma_product + C2 / 2.0);

    let raw = (luminance * contrast * structure).clamp(0.0, 1.0);
    let sharpened = 1.0 / (1.0 + (-SHARPENING * (raw - 0.5)).exp());

    trace!(
        samples = moments.count,
        step = plan.step,
        luminance,
        contrast,
        structure,
        raw,
        sharpened,
        "Structural components"
    );
    sharpened
}

// -- Histogram similarity -----------------------------------------------------

/// Normalised luma histogram over the overlap, sampled every `step` pixels.
fn luma_histogram(image: &RasterImage, width: u32, height: u32, step: u32) -> [f64; HISTOGRAM_BINS] {
    let mut counts = [0u64; HISTOGRAM_BINS];
    let mut total = 0u64;
    for y in (0..height).step_by(step as usize) {
        for x in (0..width).step_by(step as usize) {
            let bin = (luma(image.rgb_at(x, y)) as usize * HISTOGRAM_BINS / 256).min(HISTOGRAM_BINS - 1);
            counts[bin] += 1;
            total += 1;
        }
    }

    let mut histogram = [0.0; HISTOGRAM_BINS];
    if total > 0 {
        for (slot, count) in histogram.iter_mut().zip(counts) {
            *slot = count as f64 / total as f64;
        }
    }
    histogram
}

/// Bhattacharyya coefficient of two probability distributions.
fn bhattacharyya(h1: &[f64], h2: &[f64]) -> f64 {
    h1.iter().zip(h2).map(|(a, b)| (a * b).sqrt()).sum()
}

/// Pearson correlation of two distributions. Two constant distributions are
/// defined to correlate perfectly; one constant against one varying yields 0.
fn correlation(h1: &[f64], h2: &[f64]) -> f64 {
    let n = h1.len() as f64;
    let mean1 = h1.iter().sum::<f64>() / n;
    let mean2 = h2.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut spread1 = 0.0;
    let mut spread2 = 0.0;
    for (a, b) in h1.iter().zip(h2) {
        let da = a - mean1;
        let db = b - mean2;
        numerator += da * db;
        spread1 += da * da;
        spread2 += db * db;
    }

    match (spread1 == 0.0, spread2 == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => numerator / (spread1 * spread2).sqrt(),
    }
}

/// Histogram intersection of two probability distributions.
fn intersection(h1: &[f64], h2: &[f64]) -> f64 {
    h1.iter().zip(h2).map(|(a, b)| a.min(*b)).sum()
}

/// Blend of Bhattacharyya, correlation and intersection over 64-bin luma
/// histograms of the overlap.
pub fn histogram_similarity(a: &RasterImage, b: &RasterImage, width: u32, height: u32) -> f64 {
    let step = (width.min(height) / 64).max(1);
    let h1 = luma_histogram(a, width, height, step);
    let h2 = luma_histogram(b, width, height, step);

    let bhattacharyya = bhattacharyya(&h1, &h2);
    let correlation = correlation(&h1, &h2);
    let intersection = intersection(&h1, &h2);

    let score = BHATTACHARYYA_WEIGHT * bhattacharyya
        + CORRELATION_WEIGHT * correlation.max(0.0)
        + INTERSECTION_WEIGHT * intersection;

    trace!(step, bhattacharyya, correlation, intersection, score, "Histogram components");
    score.clamp(0.0, 1.0)
}
