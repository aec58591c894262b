// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral normalisation — rotate detector output so it starts at the
// vertex nearest the image origin, and size the perspective crop.

use docscan_core::error::DocscanError;
use docscan_core::{Point, Quadrilateral};
use tracing::debug;

/// Rotate `points` so the vertex closest to (0, 0) comes first.
///
/// The relative order of the vertices is kept, so a detector that reports a
/// consistent winding yields left-top, right-top, right-bottom, left-bottom.
/// When two vertices are equally close, the one that appears first wins.
///
/// Fails with `InvalidArgument` unless exactly four points are given.
pub fn normalize(points: &[Point]) -> Result<Quadrilateral, DocscanError> {
    let quad = Quadrilateral::from_points(points)?;
    Ok(normalize_quad(quad))
}

/// Infallible form of [`normalize`] for an already-validated quadrilateral.
pub fn normalize_quad(quad: Quadrilateral) -> Quadrilateral {
    let points = quad.into_points();
    let start = closest_to_origin(&points);
    if start == 0 {
        return Quadrilateral::new(points);
    }
    debug!(start, "Rotating quadrilateral to origin-nearest vertex");
    Quadrilateral::new(std::array::from_fn(|k| points[(start + k) % 4]))
}

/// Index of the first vertex with the smallest distance to the origin.
fn closest_to_origin(points: &[Point; 4]) -> usize {
    let mut best = 0;
    let mut best_distance = points[0].distance_to(&Point::ORIGIN);
    for (index, point) in points.iter().enumerate().skip(1) {
        let distance = point.distance_to(&Point::ORIGIN);
        // Strict comparison keeps the earliest vertex on ties.
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// Output size for a perspective crop of `quad`.
///
/// Each side length is the mean of the two opposite edges, which evens out
/// skew noise from the detector. `quad` must already be normalised.
pub fn crop_dimensions(quad: &Quadrilateral) -> (u32, u32) {
    let [left_top, right_top, right_bottom, left_bottom] = *quad.points();

    let width = (left_top.distance_to(&right_top) + left_bottom.distance_to(&right_bottom)) / 2.0;
    let height = (left_top.distance_to(&left_bottom) + right_top.distance_to(&right_bottom)) / 2.0;

    (width.round() as u32, height.round() as u32)
}
