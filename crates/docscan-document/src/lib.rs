// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-document — Image-side processing for the docscan capture core.
//
// Provides corner normalization and crop sizing, frame similarity scoring,
// resolution-based quality estimation, a pluggable vision engine (with an
// imageproc-backed implementation), and the quality-adaptive filter pipeline.

pub mod geometry;
pub mod pipeline;
pub mod quality;
pub mod raster;
pub mod similarity;
pub mod vision;

// Re-export the primary entry points so callers can use `docscan_document::Pipeline` etc.
pub use geometry::{crop_dimensions, normalize, normalize_quad};
pub use pipeline::{FilterStep, Pipeline, Recipe};
pub use quality::{QualityEstimator, estimate_quality};
pub use raster::{RasterImage, ReleaseProbe};
pub use similarity::similarity;
pub use vision::{ImageprocEngine, VisionEngine};
