// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter recipes — the fixed step sequence for each processing mode and
// quality tier.

use docscan_core::{BinarizeMethod, ProcessingMode, QualityScore, QualityTier, TierThresholds};
use serde::Serialize;

/// Denoise strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Denoise {
    Basic,
    Advanced,
}

/// One vision-engine call in a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterStep {
    SeparateBackground,
    Grayscale,
    Denoise(Denoise),
    EnhanceContrast,
    Binarize(BinarizeMethod),
}

impl FilterStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SeparateBackground => "separate_background",
            Self::Grayscale => "to_grayscale",
            Self::Denoise(_) => "denoise",
            Self::EnhanceContrast => "enhance_contrast",
            Self::Binarize(_) => "binarize",
        }
    }
}

impl std::fmt::Display for FilterStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denoise(level) => write!(f, "denoise({level:?})"),
            Self::Binarize(method) => write!(f, "binarize({method:?})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Immutable description of a filter chain.
///
/// Steps always run in the order background separation, grayscale, denoise,
/// contrast, binarize; the fields only switch optional steps on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub separate_background: bool,
    pub denoise: Option<Denoise>,
    pub contrast_passes: u8,
    pub binarize: BinarizeMethod,
}

impl Recipe {
    /// Expand into the ordered vision-engine calls.
    pub fn steps(&self) -> Vec<FilterStep> {
        let mut steps = Vec::with_capacity(4 + self.contrast_passes as usize);
        if self.separate_background {
            steps.push(FilterStep::SeparateBackground);
        }
        steps.push(FilterStep::Grayscale);
        if let Some(level) = self.denoise {
            steps.push(FilterStep::Denoise(level));
        }
        for _ in 0..self.contrast_passes {
            steps.push(FilterStep::EnhanceContrast);
        }
        steps.push(FilterStep::Binarize(self.binarize));
        steps
    }
}

pub const OCR_OPTIMIZED: Recipe = Recipe {
    separate_background: true,
    denoise: Some(Denoise::Advanced),
    contrast_passes: 1,
    binarize: BinarizeMethod::Combined,
};

pub const PRINTED_DOCUMENT: Recipe = Recipe {
    separate_background: false,
    denoise: Some(Denoise::Basic),
    contrast_passes: 1,
    binarize: BinarizeMethod::Otsu,
};

pub const HANDWRITTEN_DOCUMENT: Recipe = Recipe {
    separate_background: false,
    denoise: Some(Denoise::Advanced),
    contrast_passes: 1,
    binarize: BinarizeMethod::AdaptiveGaussian,
};

pub const WHITEBOARD: Recipe = Recipe {
    separate_background: true,
    denoise: None,
    contrast_passes: 1,
    binarize: BinarizeMethod::AdaptiveMean,
};

pub const ADVANCED: Recipe = Recipe {
    separate_background: true,
    denoise: Some(Denoise::Basic),
    contrast_passes: 1,
    binarize: BinarizeMethod::Combined,
};

/// Poor sources get every clean-up step and a second contrast pass,
/// whatever the mode.
pub const LOW_QUALITY: Recipe = Recipe {
    separate_background: true,
    denoise: Some(Denoise::Advanced),
    contrast_passes: 2,
    binarize: BinarizeMethod::Combined,
};

/// The standard recipe for `mode`.
pub fn mode_recipe(mode: ProcessingMode) -> &'static Recipe {
    match mode {
        ProcessingMode::OcrOptimized => &OCR_OPTIMIZED,
        ProcessingMode::PrintedDocument => &PRINTED_DOCUMENT,
        ProcessingMode::HandwrittenDocument => &HANDWRITTEN_DOCUMENT,
        ProcessingMode::Whiteboard => &WHITEBOARD,
        ProcessingMode::Advanced => &ADVANCED,
    }
}

/// Good sources keep detail: grayscale, light denoise, and the mode's
/// binarization only.
pub fn high_quality_recipe(mode: ProcessingMode) -> Recipe {
    Recipe {
        separate_background: false,
        denoise: Some(Denoise::Basic),
        contrast_passes: 0,
        binarize: mode_recipe(mode).binarize,
    }
}

/// Pick the recipe for `mode`, letting a known quality score override it.
pub fn select_recipe(
    mode: ProcessingMode,
    quality: Option<QualityScore>,
    tiers: &TierThresholds,
) -> Recipe {
    match quality.map(|score| tiers.classify(score)) {
        Some(QualityTier::Low) => LOW_QUALITY,
        Some(QualityTier::High) => high_quality_recipe(mode),
        Some(QualityTier::Standard) | None => *mode_recipe(mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: i64) -> Option<QualityScore> {
        Some(QualityScore::saturating(value))
    }

    #[test]
    fn printed_document_chain() {
        assert_eq!(
            mode_recipe(ProcessingMode::PrintedDocument).steps(),
            vec![
                FilterStep::Grayscale,
                FilterStep::Denoise(Denoise::Basic),
                FilterStep::EnhanceContrast,
                FilterStep::Binarize(BinarizeMethod::Otsu),
            ]
        );
    }

    #[test]
    fn whiteboard_skips_denoise() {
        assert_eq!(
            mode_recipe(ProcessingMode::Whiteboard).steps(),
            vec![
                FilterStep::SeparateBackground,
                FilterStep::Grayscale,
                FilterStep::EnhanceContrast,
                FilterStep::Binarize(BinarizeMethod::AdaptiveMean),
            ]
        );
    }

    #[test]
    fn mode_table() {
        let table = [
            (ProcessingMode::OcrOptimized, true, Some(Denoise::Advanced), BinarizeMethod::Combined),
            (ProcessingMode::PrintedDocument, false, Some(Denoise::Basic), BinarizeMethod::Otsu),
            (
                ProcessingMode::HandwrittenDocument,
                false,
                Some(Denoise::Advanced),
                BinarizeMethod::AdaptiveGaussian,
            ),
            (ProcessingMode::Whiteboard, true, None, BinarizeMethod::AdaptiveMean),
            (ProcessingMode::Advanced, true, Some(Denoise::Basic), BinarizeMethod::Combined),
        ];
        for (mode, background, denoise, binarize) in table {
            let recipe = mode_recipe(mode);
            assert_eq!(recipe.separate_background, background, "{mode}");
            assert_eq!(recipe.denoise, denoise, "{mode}");
            assert_eq!(recipe.contrast_passes, 1, "{mode}");
            assert_eq!(recipe.binarize, binarize, "{mode}");
        }
    }

    #[test]
    fn low_quality_overrides_every_mode() {
        let tiers = TierThresholds::default();
        for mode in ProcessingMode::ALL {
            let steps = select_recipe(mode, q(10), &tiers).steps();
            assert_eq!(
                steps,
                vec![
                    FilterStep::SeparateBackground,
                    FilterStep::Grayscale,
                    FilterStep::Denoise(Denoise::Advanced),
                    FilterStep::EnhanceContrast,
                    FilterStep::EnhanceContrast,
                    FilterStep::Binarize(BinarizeMethod::Combined),
                ],
                "{mode}"
            );
        }
    }

    #[test]
    fn high_quality_keeps_mode_binarization_only() {
        let tiers = TierThresholds::default();
        let steps = select_recipe(ProcessingMode::HandwrittenDocument, q(90), &tiers).steps();
        assert_eq!(
            steps,
            vec![
                FilterStep::Grayscale,
                FilterStep::Denoise(Denoise::Basic),
                FilterStep::Binarize(BinarizeMethod::AdaptiveGaussian),
            ]
        );
    }

    #[test]
    fn standard_tier_and_unknown_quality_use_mode_recipe() {
        let tiers = TierThresholds::default();
        for mode in ProcessingMode::ALL {
            assert_eq!(select_recipe(mode, None, &tiers), *mode_recipe(mode));
            assert_eq!(select_recipe(mode, q(30), &tiers), *mode_recipe(mode));
            assert_eq!(select_recipe(mode, q(80), &tiers), *mode_recipe(mode));
        }
    }

    #[test]
    fn step_display_names() {
        assert_eq!(FilterStep::Grayscale.to_string(), "to_grayscale");
        assert_eq!(
            FilterStep::Binarize(BinarizeMethod::Otsu).to_string(),
            "binarize(Otsu)"
        );
        assert_eq!(FilterStep::Denoise(Denoise::Advanced).name(), "denoise");
    }
}
