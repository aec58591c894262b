// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization kernels — local-mean, Gaussian-weighted, Otsu, and combined
// thresholding of single-channel images.

use docscan_core::BinarizeMethod;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use tracing::debug;

/// Neighbourhood radius for local-mean thresholding (an 11x11 window).
pub const ADAPTIVE_RADIUS: u32 = 5;
/// Gaussian sigma approximating an 11x11 weighted window.
pub const ADAPTIVE_SIGMA: f32 = 2.0;
/// Offset subtracted from the local mean before comparing.
pub const ADAPTIVE_OFFSET: i32 = 2;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// Threshold `gray` with the requested method. Output pixels are 0 (ink) or
/// 255 (paper).
pub fn binarize_gray(gray: &GrayImage, method: BinarizeMethod) -> GrayImage {
    match method {
        BinarizeMethod::AdaptiveMean => adaptive_mean(gray, ADAPTIVE_RADIUS, ADAPTIVE_OFFSET),
        BinarizeMethod::AdaptiveGaussian => {
            adaptive_gaussian(gray, ADAPTIVE_SIGMA, ADAPTIVE_OFFSET)
        }
        BinarizeMethod::Otsu => global(gray, otsu_threshold(gray)),
        BinarizeMethod::Combined => {
            let local = adaptive_gaussian(gray, ADAPTIVE_SIGMA, ADAPTIVE_OFFSET);
            let otsu = global(gray, otsu_threshold(gray));
            GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                let both_ink =
                    local.get_pixel(x, y).0[0] == INK && otsu.get_pixel(x, y).0[0] == INK;
                Luma([if both_ink { INK } else { PAPER }])
            })
        }
    }
}

/// Pixels darker than `threshold` become ink.
fn global(gray: &GrayImage, threshold: u8) -> GrayImage {
    debug!(threshold, "Applying global threshold");
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([if gray.get_pixel(x, y).0[0] < threshold { INK } else { PAPER }])
    })
}

/// Local mean over a `(2r+1)` square window, minus `offset`.
pub fn adaptive_mean(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let sums = integral_image::<_, u64>(gray);

    GrayImage::from_fn(width, height, |x, y| {
        let local_mean = window_mean(&sums, (width, height), x, y, radius);
        let threshold = (local_mean as i32 - offset).clamp(0, 255);
        Luma([if (gray.get_pixel(x, y).0[0] as i32) < threshold { INK } else { PAPER }])
    })
}

/// Gaussian-weighted local mean, minus `offset`.
pub fn adaptive_gaussian(gray: &GrayImage, sigma: f32, offset: i32) -> GrayImage {
    let weighted_mean = gaussian_blur_f32(gray, sigma);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let threshold = (weighted_mean.get_pixel(x, y).0[0] as i32 - offset).clamp(0, 255);
        Luma([if (gray.get_pixel(x, y).0[0] as i32) < threshold { INK } else { PAPER }])
    })
}

/// Mean luma of the window of `radius` around `(x, y)`, clipped to a frame of
/// `size`. `sums` is the frame's summed-area table.
fn window_mean(sums: &Image<Luma<u64>>, size: (u32, u32), x: u32, y: u32, radius: u32) -> f64 {
    let (width, height) = size;
    let left = x.saturating_sub(radius);
    let top = y.saturating_sub(radius);
    let right = x.saturating_add(radius).min(width - 1);
    let bottom = y.saturating_add(radius).min(height - 1);

    let count = u64::from(right - left + 1) * u64::from(bottom - top + 1);
    sum_image_pixels(sums, left, top, right, bottom)[0] as f64 / count as f64
}

/// Otsu's threshold: the split maximising between-class variance. Pixels
/// strictly below the returned value are ink.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    if gray.width() == 0 || gray.height() == 0 {
        return 128;
    }
    // `otsu_level` is the last luma of the dark class.
    otsu_level(gray).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Light page with a dark 10x10 block in the middle.
    fn page_with_block() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            if (15..25).contains(&x) && (15..25).contains(&y) {
                Luma([30])
            } else {
                Luma([210])
            }
        })
    }

    fn ink_at(img: &GrayImage, x: u32, y: u32) -> bool {
        img.get_pixel(x, y).0[0] == INK
    }

    #[test]
    fn otsu_splits_two_levels() {
        let threshold = otsu_threshold(&page_with_block());
        assert!(threshold > 30 && threshold <= 210, "threshold = {}", threshold);
    }

    #[test]
    fn otsu_of_empty_image_defaults_to_mid_gray() {
        assert_eq!(otsu_threshold(&GrayImage::new(0, 0)), 128);
    }

    #[test]
    fn every_method_marks_the_block_as_ink() {
        let page = page_with_block();
        for method in [
            BinarizeMethod::AdaptiveGaussian,
            BinarizeMethod::AdaptiveMean,
            BinarizeMethod::Otsu,
            BinarizeMethod::Combined,
        ] {
            let out = binarize_gray(&page, method);
            assert!(ink_at(&out, 15, 15), "{method:?} missed the block edge");
            assert!(!ink_at(&out, 2, 2), "{method:?} inked the margin");
            assert!(out.pixels().all(|p| p.0[0] == INK || p.0[0] == PAPER));
        }
    }

    #[test]
    fn global_threshold_is_strict() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 99 } else { 100 }]));
        let out = global(&img, 100);
        assert!(ink_at(&out, 0, 0));
        assert!(!ink_at(&out, 1, 0));
    }

    #[test]
    fn window_mean_clips_at_edges() {
        let img = GrayImage::from_pixel(4, 4, Luma([60]));
        let sums = integral_image::<_, u64>(&img);
        assert!((window_mean(&sums, (4, 4), 0, 0, 5) - 60.0).abs() < 1e-9);

        let ramp = GrayImage::from_fn(3, 1, |x, _| Luma([x as u8 * 30]));
        let sums = integral_image::<_, u64>(&ramp);
        assert!((window_mean(&sums, (3, 1), 0, 0, 1) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn flat_page_stays_paper_under_adaptive_thresholds() {
        let flat = GrayImage::from_pixel(30, 30, Luma([180]));
        assert!(adaptive_mean(&flat, 5, 2).pixels().all(|p| p.0[0] == PAPER));
        assert!(adaptive_gaussian(&flat, 2.0, 2).pixels().all(|p| p.0[0] == PAPER));
    }
}
