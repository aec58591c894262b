// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docscan.

use serde::{Deserialize, Serialize};

use crate::error::{DocscanError, Result};

/// Image-space coordinate. `x` grows rightwards, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self {
            x: x as f64,
            y: y as f64,
        }
    }
}

/// The four-vertex boundary of a detected document region.
///
/// Vertex order is whatever the detector produced until the quadrilateral is
/// normalised; afterwards index 0 is the vertex nearest the image origin and
/// the sequence reads left-top, right-top, right-bottom, left-bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral([Point; 4]);

impl Quadrilateral {
    pub fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// Build a quadrilateral from an arbitrary slice, rejecting anything that
    /// is not exactly four points.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            DocscanError::InvalidArgument(format!(
                "a quadrilateral needs exactly 4 points, got {}",
                points.len()
            ))
        })?;
        Ok(Self(points))
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn into_points(self) -> [Point; 4] {
        self.0
    }

    /// Enclosed area via the shoelace formula. Vertices must be in order
    /// (CW or CCW).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Shoelace area, positive when the vertices run clockwise on screen
    /// (y pointing down), as in left-top, right-top, right-bottom, left-bottom.
    pub fn signed_area(&self) -> f64 {
        let mut twice_area = 0.0;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            twice_area += a.x * b.y - b.x * a.y;
        }
        twice_area / 2.0
    }

    /// True when all turns have the same orientation (no self-intersection,
    /// no reflex vertex).
    pub fn is_convex(&self) -> bool {
        let mut sign = 0.0f64;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            let c = self.0[(i + 2) % 4];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross == 0.0 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        sign != 0.0
    }
}

/// Document flavour selected by the user. Each maps to a fixed filter recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    OcrOptimized,
    PrintedDocument,
    HandwrittenDocument,
    Whiteboard,
    /// General-purpose recipe used when nothing more specific is requested.
    #[default]
    Advanced,
}

impl ProcessingMode {
    pub const ALL: [ProcessingMode; 5] = [
        Self::OcrOptimized,
        Self::PrintedDocument,
        Self::HandwrittenDocument,
        Self::Whiteboard,
        Self::Advanced,
    ];

    /// Stable keyword used in configuration files and on the command line.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::OcrOptimized => "ocr-optimized",
            Self::PrintedDocument => "printed-document",
            Self::HandwrittenDocument => "handwritten-document",
            Self::Whiteboard => "whiteboard",
            Self::Advanced => "advanced",
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = DocscanError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.keyword() == wanted)
            .ok_or_else(|| DocscanError::InvalidArgument(format!("unknown processing mode: {s}")))
    }
}

/// Thresholding strategy used by the final binarization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinarizeMethod {
    AdaptiveGaussian,
    AdaptiveMean,
    Otsu,
    /// Adaptive Gaussian and Otsu must both agree a pixel is ink.
    Combined,
}

/// Colour layout of a raster buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Color,
    Gray,
}

/// Heuristic suitability of an image as a document scan, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct QualityScore(u8);

impl QualityScore {
    pub const MIN: QualityScore = QualityScore(0);
    pub const MAX: QualityScore = QualityScore(100);

    /// Clamp any integer into the valid range.
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for QualityScore {
    type Error = DocscanError;

    fn try_from(value: i64) -> Result<Self> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DocscanError::InvalidArgument(format!(
                "quality score must be within 0..=100, got {value}"
            )))
        }
    }
}

impl From<QualityScore> for u8 {
    fn from(score: QualityScore) -> Self {
        score.0
    }
}

impl std::fmt::Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing strength selected from a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    /// Poor source: compensate with extra clean-up.
    Low,
    Standard,
    /// Good source: touch it as little as possible.
    High,
}

/// Outcome of comparing two frames. All three values lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Sharpened SSIM-style luminance/contrast/structure agreement.
    pub structural: f64,
    /// Weighted blend of histogram distance measures.
    pub histogram: f64,
    /// `0.7 * structural + 0.3 * histogram`.
    pub combined: f64,
}

impl SimilarityScore {
    pub const ZERO: SimilarityScore = SimilarityScore {
        structural: 0.0,
        histogram: 0.0,
        combined: 0.0,
    };

    /// Whether the candidate should be treated as a duplicate of the reference.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.combined > threshold
    }
}
