// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocscanError, Result};
use crate::types::{ProcessingMode, QualityScore, QualityTier};

/// Settings for a capture session and the processing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Recipe used when the caller does not pick a mode.
    pub default_mode: ProcessingMode,
    /// Frames scoring strictly above this are skipped as duplicates.
    pub similarity_threshold: f64,
    /// Delay between auto-capture cycles, in milliseconds.
    pub capture_interval_ms: u64,
    /// Linear downscale factor applied to frames before similarity checks.
    pub preview_downscale: u32,
    /// Detect and crop the document quadrilateral before processing.
    pub crop_detected_quad: bool,
    /// Heuristic used to score frame quality.
    pub quality_policy: QualityPolicy,
    /// Quality boundaries between processing tiers.
    pub tier_thresholds: TierThresholds,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_mode: ProcessingMode::Advanced,
            similarity_threshold: 0.85,
            capture_interval_ms: 1000,
            preview_downscale: 4,
            crop_detected_quad: true,
            quality_policy: QualityPolicy::default(),
            tier_thresholds: TierThresholds::default(),
        }
    }
}

impl ScanConfig {
    /// Parse and validate a JSON configuration document. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DocscanError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.capture_interval_ms == 0 {
            return Err(DocscanError::Config(
                "capture_interval_ms must be positive".into(),
            ));
        }
        if self.preview_downscale == 0 {
            return Err(DocscanError::Config(
                "preview_downscale must be at least 1".into(),
            ));
        }
        if self.tier_thresholds.low > self.tier_thresholds.high {
            return Err(DocscanError::Config(format!(
                "tier_thresholds.low ({}) exceeds tier_thresholds.high ({})",
                self.tier_thresholds.low, self.tier_thresholds.high
            )));
        }
        self.quality_policy.validate()
    }

    pub fn capture_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.capture_interval_ms)
    }
}

/// Quality boundaries. Scores below `low` take the low-quality recipe, scores
/// above `high` take the high-quality recipe, everything else is standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub low: u8,
    pub high: u8,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self { low: 30, high: 80 }
    }
}

impl TierThresholds {
    pub fn classify(&self, score: QualityScore) -> QualityTier {
        let value = score.value();
        if value < self.low {
            QualityTier::Low
        } else if value > self.high {
            QualityTier::High
        } else {
            QualityTier::Standard
        }
    }
}

/// One pixel-count bonus step: images with at least `min_pixels` pixels earn
/// `bonus` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionBonus {
    pub min_pixels: u64,
    pub bonus: i32,
}

/// Heuristic quality scoring constants.
///
/// These are tuning values, not derived quantities. Only the first matching
/// resolution step applies, so `resolution_bonuses` must be sorted by
/// descending `min_pixels` with non-increasing bonuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    pub base_score: i32,
    pub resolution_bonuses: Vec<ResolutionBonus>,
    /// Exclusive aspect-ratio band (width / height) that earns `aspect_bonus`.
    pub aspect_band: (f64, f64),
    pub aspect_bonus: i32,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            base_score: 50,
            resolution_bonuses: vec![
                ResolutionBonus {
                    min_pixels: 2_000_000,
                    bonus: 25,
                },
                ResolutionBonus {
                    min_pixels: 1_000_000,
                    bonus: 15,
                },
                ResolutionBonus {
                    min_pixels: 500_000,
                    bonus: 10,
                },
            ],
            aspect_band: (0.7, 1.5),
            aspect_bonus: 10,
        }
    }
}

impl QualityPolicy {
    pub fn validate(&self) -> Result<()> {
        let ordered = self.resolution_bonuses.windows(2).all(|pair| {
            pair[0].min_pixels > pair[1].min_pixels && pair[0].bonus >= pair[1].bonus
        });
        if !ordered {
            return Err(DocscanError::Config(
                "quality_policy.resolution_bonuses must be sorted by descending min_pixels \
                 with non-increasing bonuses"
                    .into(),
            ));
        }
        let (lo, hi) = self.aspect_band;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(DocscanError::Config(format!(
                "quality_policy.aspect_band must be an increasing pair, got ({lo}, {hi})"
            )));
        }
        Ok(())
    }
}
