// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Heuristic scan-quality estimate used to choose a processing tier.

use docscan_core::{QualityPolicy, QualityScore};
use tracing::debug;

use crate::raster::RasterImage;

/// Score `image` with the default [`QualityPolicy`].
pub fn estimate_quality(image: &RasterImage) -> QualityScore {
    QualityEstimator::default().estimate(image)
}

/// Scores images from their size and shape alone.
///
/// This is a routing hint, not a gate: the score only selects how hard the
/// pipeline works on an image.
#[derive(Debug, Clone, Default)]
pub struct QualityEstimator {
    policy: QualityPolicy,
}

impl QualityEstimator {
    pub fn new(policy: QualityPolicy) -> Self {
        Self { policy }
    }

    pub fn estimate(&self, image: &RasterImage) -> QualityScore {
        self.estimate_dimensions(image.width(), image.height())
    }

    /// Score from dimensions only, for callers that have not decoded yet.
    pub fn estimate_dimensions(&self, width: u32, height: u32) -> QualityScore {
        let pixels = width as u64 * height as u64;
        let mut score = self.policy.base_score as i64;

        let resolution_bonus = self
            .policy
            .resolution_bonuses
            .iter()
            .find(|step| pixels >= step.min_pixels)
            .map_or(0, |step| step.bonus);
        score += resolution_bonus as i64;

        let (low, high) = self.policy.aspect_band;
        let aspect_bonus = if height > 0 {
            let aspect = width as f64 / height as f64;
            if aspect > low && aspect < high {
                self.policy.aspect_bonus
            } else {
                0
            }
        } else {
            0
        };
        score += aspect_bonus as i64;

        let quality = QualityScore::saturating(score);
        debug!(
            width,
            height,
            resolution_bonus,
            aspect_bonus,
            quality = quality.value(),
            "Quality estimated"
        );
        quality
    }
}
