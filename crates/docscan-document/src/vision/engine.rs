// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `VisionEngine` implemented with the `image` and `imageproc` crates.

use docscan_core::error::{DocscanError, Result};
use docscan_core::{BinarizeMethod, PixelFormat, Quadrilateral};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument};

use super::VisionEngine;
use super::detect::find_document_quad;
use super::threshold::binarize_gray;
use crate::geometry::{crop_dimensions, normalize_quad};
use crate::raster::RasterImage;

/// Pure-Rust vision engine.
///
/// Every kernel works on 8-bit luma except `perspective_crop`, which keeps
/// colour. Operations that would not change their input return the same
/// buffer.
#[derive(Debug, Clone)]
pub struct ImageprocEngine {
    /// Sigma of the basic denoise blur (about a 5x5 kernel).
    pub basic_denoise_sigma: f32,
    /// Sigma of the blur that follows the median pass in advanced denoise.
    pub advanced_denoise_sigma: f32,
    /// Fraction of pixels clipped at each end by the contrast stretch.
    pub contrast_clip: f64,
}

impl Default for ImageprocEngine {
    fn default() -> Self {
        Self {
            basic_denoise_sigma: 1.1,
            advanced_denoise_sigma: 0.8,
            contrast_clip: 0.01,
        }
    }
}

impl ImageprocEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Longest short side at which the illumination estimate is blurred.
const BACKGROUND_WORK_SIDE: u32 = 256;

/// Reject inputs no kernel can work on.
fn ensure_pixels(image: &RasterImage, step: &str) -> Result<()> {
    if image.is_empty() {
        return Err(DocscanError::processing(
            step,
            format!("image has no pixels ({}x{})", image.width(), image.height()),
        ));
    }
    Ok(())
}

/// 8-bit luma copy of `image`, skipping the conversion when it is already gray.
fn luma_of(image: &RasterImage) -> GrayImage {
    match image.as_dynamic() {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

impl VisionEngine for ImageprocEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect_quadrilateral(&self, image: &RasterImage) -> Result<Option<Quadrilateral>> {
        ensure_pixels(image, "detect_quadrilateral")?;
        Ok(find_document_quad(&luma_of(image)))
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn perspective_crop(&self, image: &RasterImage, quad: &Quadrilateral) -> Result<RasterImage> {
        ensure_pixels(image, "perspective_crop")?;

        let quad = normalize_quad(*quad);
        let (out_w, out_h) = crop_dimensions(&quad);
        if out_w == 0 || out_h == 0 {
            return Err(DocscanError::processing(
                "perspective_crop",
                format!("degenerate crop size {out_w}x{out_h}"),
            ));
        }

        let src = quad.into_points().map(|p| (p.x as f32, p.y as f32));
        let dest = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];
        let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
            DocscanError::processing("perspective_crop", "quadrilateral has no projective mapping")
        })?;

        let rgba = image.as_dynamic().to_rgba8();
        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(
            &rgba,
            &projection,
            Interpolation::Bilinear,
            Rgba([255u8, 255, 255, 255]),
            &mut output,
        );

        info!(out_w, out_h, "Perspective crop applied");
        Ok(RasterImage::new(DynamicImage::ImageRgba8(output)))
    }

    fn to_grayscale(&self, image: &RasterImage) -> Result<RasterImage> {
        ensure_pixels(image, "to_grayscale")?;
        if matches!(image.as_dynamic(), DynamicImage::ImageLuma8(_)) {
            debug!("Already 8-bit gray");
            return Ok(image.clone());
        }
        Ok(RasterImage::from_gray(image.to_luma8()))
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn denoise(&self, image: &RasterImage, advanced: bool) -> Result<RasterImage> {
        ensure_pixels(image, "denoise")?;
        let gray = luma_of(image);
        let smoothed = if advanced {
            // Median removes speckle without smearing strokes; the light blur
            // then softens what is left.
            let median = median_filter(&gray, 1, 1);
            gaussian_blur_f32(&median, self.advanced_denoise_sigma)
        } else {
            gaussian_blur_f32(&gray, self.basic_denoise_sigma)
        };
        Ok(RasterImage::from_gray(smoothed))
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn enhance_contrast(&self, image: &RasterImage) -> Result<RasterImage> {
        ensure_pixels(image, "enhance_contrast")?;
        let gray = luma_of(image);
        let (low, high) = percentile_bounds(&gray, self.contrast_clip);
        if high <= low {
            debug!(low, high, "Flat image; nothing to stretch");
            return Ok(image.clone());
        }
        if low == 0 && high == 255 && image.format() == PixelFormat::Gray {
            debug!("Range already full");
            return Ok(image.clone());
        }

        let scale = 255.0 / (high - low) as f32;
        let stretched = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            let mapped = (v.saturating_sub(low) as f32 * scale).round().clamp(0.0, 255.0);
            Luma([mapped as u8])
        });
        debug!(low, high, "Contrast stretched");
        Ok(RasterImage::from_gray(stretched))
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn binarize(&self, image: &RasterImage, method: BinarizeMethod) -> Result<RasterImage> {
        ensure_pixels(image, "binarize")?;
        Ok(RasterImage::from_gray(binarize_gray(&luma_of(image), method)))
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn separate_background(&self, image: &RasterImage) -> Result<RasterImage> {
        ensure_pixels(image, "separate_background")?;
        let gray = luma_of(image);
        let sigma = (gray.width().min(gray.height()) as f32 / 20.0).max(8.0);
        let background = estimate_background(&gray, sigma);

        // Divide out the illumination estimate so the page becomes uniformly
        // white and ink keeps its relative darkness.
        let flattened = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y).0[0] as f32;
            let bg = (background.get_pixel(x, y).0[0] as f32).max(1.0);
            Luma([(v / bg * 255.0).round().clamp(0.0, 255.0) as u8])
        });
        debug!(sigma, "Background separated");
        Ok(RasterImage::from_gray(flattened))
    }
}

/// Integer shrink factor that brings the short side of a frame down to
/// `BACKGROUND_WORK_SIDE`, or 1 for frames already that small.
fn background_factor(width: u32, height: u32) -> u32 {
    (width.min(height) / BACKGROUND_WORK_SIDE).max(1)
}

/// Gaussian blur of `gray` at `sigma`, computed on a shrunken copy and
/// scaled back to full size. Illumination varies slowly, so the result
/// matches a full-size blur closely at a fraction of the cost.
fn estimate_background(gray: &GrayImage, sigma: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let factor = background_factor(width, height);
    if factor == 1 {
        return gaussian_blur_f32(gray, sigma);
    }

    let small = imageops::resize(gray, width / factor, height / factor, FilterType::Triangle);
    let blurred = gaussian_blur_f32(&small, (sigma / factor as f32).max(1.0));
    debug!(
        factor,
        work_w = small.width(),
        work_h = small.height(),
        "Background estimated at reduced size"
    );
    imageops::resize(&blurred, width, height, FilterType::Triangle)
}

/// Luma values below which `clip` of the pixels fall, from each end.
fn percentile_bounds(gray: &GrayImage, clip: f64) -> (u8, u8) {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    let total = gray.width() as u64 * gray.height() as u64;
    let cutoff = (total as f64 * clip).floor() as u64;

    let mut seen = 0u64;
    let mut low = 0u8;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > cutoff {
            low = value as u8;
            break;
        }
    }

    seen = 0;
    let mut high = 255u8;
    for (value, &count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > cutoff {
            high = value as u8;
            break;
        }
    }

    (low, high)
}
