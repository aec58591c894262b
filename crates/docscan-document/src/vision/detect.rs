// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection — Canny edges, Hough lines, and corner
// intersection.

use docscan_core::{Point, Quadrilateral};
use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use tracing::{debug, warn};

/// Detected quadrilaterals smaller than this fraction of the frame are
/// rejected as spurious.
const MIN_AREA_FRACTION: f64 = 0.10;

/// Find the dominant four-sided boundary in `gray`.
///
/// ## Pipeline
///
/// 1. Gaussian blur (sigma 2.0)
/// 2. Canny edge detection
/// 3. Hough line detection, vote threshold scaled by the image diagonal
/// 4. Split lines into roughly horizontal and roughly vertical sets
/// 5. Take the outermost line of each set on each side
/// 6. Intersect neighbouring edges to get the corners
///
/// Returns `None` whenever a stage cannot produce a plausible convex
/// quadrilateral covering at least a tenth of the frame. Corners come back
/// as top-left, top-right, bottom-right, bottom-left.
pub fn find_document_quad(gray: &GrayImage) -> Option<Quadrilateral> {
    let (width, height) = gray.dimensions();

    let blurred = gaussian_blur_f32(gray, 2.0);
    let edges = canny(&blurred, 50.0, 150.0);

    let diagonal = (width as f64).hypot(height as f64);
    let vote_threshold = (diagonal * 0.25).max(80.0) as u32;
    let options = LineDetectionOptions {
        vote_threshold,
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);
    debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

    if lines.len() < 4 {
        debug!(line_count = lines.len(), "Too few lines for a document boundary");
        return None;
    }

    let quad = quad_from_lines(&lines, width, height)?;

    let min_area = width as f64 * height as f64 * MIN_AREA_FRACTION;
    if quad.area() < min_area || !quad.is_convex() {
        warn!(
            area = quad.area(),
            min_area,
            convex = quad.is_convex(),
            "Rejecting implausible document boundary"
        );
        return None;
    }

    debug!(corners = ?quad.points(), "Document boundary found");
    Some(quad)
}

/// Corners of the box formed by the outermost horizontal and vertical
/// lines, wound top-left, top-right, bottom-right, bottom-left.
fn quad_from_lines(lines: &[PolarLine], width: u32, height: u32) -> Option<Quadrilateral> {
    let (horizontal, vertical) = classify_lines(lines, width, height);
    if horizontal.len() < 2 || vertical.len() < 2 {
        debug!(
            horizontal = horizontal.len(),
            vertical = vertical.len(),
            "Insufficient horizontal/vertical lines"
        );
        return None;
    }

    let (top, bottom) = outermost(&horizontal)?;
    let (left, right) = outermost(&vertical)?;

    let quad = Quadrilateral::new([
        corner(&top, &left)?,
        corner(&top, &right)?,
        corner(&bottom, &right)?,
        corner(&bottom, &left)?,
    ]);
    if quad.signed_area() < 0.0 {
        let [a, b, c, d] = quad.into_points();
        return Some(Quadrilateral::new([b, a, d, c]));
    }
    Some(quad)
}

/// A Hough line and where it crosses the frame.
///
/// `offset` is the x-coordinate at which a vertical line crosses the
/// horizontal midline, or the y-coordinate at which a horizontal line crosses
/// the vertical midline. Hough `r` cannot be compared directly because its
/// sign flips between normals near 0° and normals near 180°.
#[derive(Debug, Clone, Copy)]
struct Edge {
    line: PolarLine,
    offset: f64,
}

/// Unit normal `(cos θ, sin θ)` of a Hough line.
fn normal(line: &PolarLine) -> (f64, f64) {
    let (sin, cos) = (line.angle_in_degrees as f64).to_radians().sin_cos();
    (cos, sin)
}

/// Split Hough lines into roughly horizontal and roughly vertical edges.
///
/// `PolarLine::angle_in_degrees` is the angle of the line's normal, so a
/// normal near 90° describes a horizontal line and a normal near 0° or 180°
/// describes a vertical one. Lines within 30° of either axis are kept; the
/// diagonals in between are discarded.
fn classify_lines(lines: &[PolarLine], width: u32, height: u32) -> (Vec<Edge>, Vec<Edge>) {
    let (mid_x, mid_y) = (width as f64 / 2.0, height as f64 / 2.0);
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        let angle = line.angle_in_degrees;
        let (cos, sin) = normal(line);
        let r = line.r as f64;
        if (60..=120).contains(&angle) {
            let offset = (r - mid_x * cos) / sin;
            horizontal.push(Edge { line: *line, offset });
        } else if angle <= 30 || angle >= 150 {
            let offset = (r - mid_y * sin) / cos;
            vertical.push(Edge { line: *line, offset });
        }
    }

    (horizontal, vertical)
}

/// The edges with the smallest and largest offset: top and bottom, or left
/// and right.
fn outermost(edges: &[Edge]) -> Option<(PolarLine, PolarLine)> {
    let by_offset = |a: &&Edge, b: &&Edge| a.offset.total_cmp(&b.offset);
    let first = edges.iter().min_by(by_offset)?;
    let last = edges.iter().max_by(by_offset)?;
    Some((first.line, last.line))
}

/// Where two Hough lines `x·cos θ + y·sin θ = r` cross, or `None` when they
/// are (nearly) parallel.
fn corner(a: &PolarLine, b: &PolarLine) -> Option<Point> {
    let (a_cos, a_sin) = normal(a);
    let (b_cos, b_sin) = normal(b);
    let det = a_cos * b_sin - a_sin * b_cos;
    if det.abs() < 1e-6 {
        return None;
    }

    // Cramer's rule on the 2x2 system of both normal equations.
    let (a_r, b_r) = (a.r as f64, b.r as f64);
    let x = (a_r * b_sin - b_r * a_sin) / det;
    let y = (a_cos * b_r - b_cos * a_r) / det;
    Some(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{crop_dimensions, normalize_quad};
    use image::Luma;

    /// Hough line through `(x, y)` with its normal at `angle` degrees.
    fn line_through(angle: u32, x: f64, y: f64) -> PolarLine {
        let (sin, cos) = (angle as f64).to_radians().sin_cos();
        PolarLine {
            r: (x * cos + y * sin) as f32,
            angle_in_degrees: angle,
        }
    }

    /// 300x380 light page on a dark 400x500 frame, turned `degrees` about
    /// the frame centre.
    fn rotated_page(degrees: f64) -> GrayImage {
        let (sin, cos) = degrees.to_radians().sin_cos();
        GrayImage::from_fn(400, 500, |x, y| {
            let (dx, dy) = (x as f64 - 200.0, y as f64 - 250.0);
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            Luma([if u.abs() <= 150.0 && v.abs() <= 190.0 { 240 } else { 30 }])
        })
    }

    #[test]
    fn blank_image_has_no_boundary() {
        let img = GrayImage::from_pixel(200, 300, Luma([200u8]));
        assert!(find_document_quad(&img).is_none());
    }

    #[test]
    fn tiny_image_does_not_panic() {
        let img = GrayImage::from_pixel(5, 5, Luma([0u8]));
        assert!(find_document_quad(&img).is_none());
    }

    #[test]
    fn slightly_rotated_pages_keep_their_orientation() {
        for degrees in [-2.0, 0.0, 2.0] {
            let quad = find_document_quad(&rotated_page(degrees))
                .unwrap_or_else(|| panic!("no page found at {degrees}°"));
            assert!(quad.is_convex());
            assert!(quad.signed_area() > 0.0, "{degrees}°: {:?}", quad.points());

            let [tl, tr, br, bl] = quad.into_points();
            assert!(tl.x < 200.0 && tl.y < 250.0, "{degrees}°: top-left {tl:?}");
            assert!(tr.x > 200.0 && tr.y < 250.0, "{degrees}°: top-right {tr:?}");
            assert!(br.x > 200.0 && br.y > 250.0, "{degrees}°: bottom-right {br:?}");
            assert!(bl.x < 200.0 && bl.y > 250.0, "{degrees}°: bottom-left {bl:?}");

            let (w, h) = crop_dimensions(&normalize_quad(quad));
            assert!((280..=320).contains(&w), "{degrees}°: width {w}");
            assert!((360..=400).contains(&h), "{degrees}°: height {h}");
        }
    }

    #[test]
    fn verticals_with_obtuse_normals_keep_left_and_right() {
        // Both verticals lean so that their normals sit at 178°, which gives
        // them negative `r`; the left edge has the smaller magnitude.
        let lines = [
            line_through(178, 50.0, 250.0),
            line_through(178, 350.0, 250.0),
            line_through(88, 200.0, 60.0),
            line_through(88, 200.0, 440.0),
        ];
        assert!(lines[0].r < 0.0 && lines[1].r < lines[0].r);

        let quad = quad_from_lines(&lines, 400, 500).unwrap();
        let [tl, tr, br, bl] = quad.into_points();
        assert!(tl.x < 100.0 && tl.y < 100.0, "top-left {tl:?}");
        assert!(tr.x > 300.0 && tr.y < 100.0, "top-right {tr:?}");
        assert!(br.x > 300.0 && br.y > 400.0, "bottom-right {br:?}");
        assert!(bl.x < 100.0 && bl.y > 400.0, "bottom-left {bl:?}");
    }

    #[test]
    fn edges_are_ordered_across_the_frame() {
        let lines = [
            line_through(2, 340.0, 250.0),
            line_through(178, 60.0, 250.0),
            line_through(90, 200.0, 400.0),
            line_through(92, 200.0, 80.0),
            line_through(45, 200.0, 250.0),
        ];
        let (horizontal, vertical) = classify_lines(&lines, 400, 500);
        assert_eq!(horizontal.len(), 2);
        assert_eq!(vertical.len(), 2);

        let (left, right) = outermost(&vertical).unwrap();
        assert_eq!(left.angle_in_degrees, 178);
        assert_eq!(right.angle_in_degrees, 2);
        let (top, bottom) = outermost(&horizontal).unwrap();
        assert_eq!(top.angle_in_degrees, 92);
        assert_eq!(bottom.angle_in_degrees, 90);

        assert!(outermost(&[]).is_none());
    }

    #[test]
    fn perpendicular_lines_meet_at_a_corner() {
        let pt = corner(&line_through(90, 0.0, 100.0), &line_through(0, 50.0, 0.0)).unwrap();
        assert!((pt.x - 50.0).abs() < 0.5 && (pt.y - 100.0).abs() < 0.5, "got {pt:?}");
    }

    #[test]
    fn parallel_lines_have_no_corner() {
        assert!(corner(&line_through(0, 50.0, 0.0), &line_through(0, 100.0, 0.0)).is_none());
    }
}
