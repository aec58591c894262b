// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster image handle — a reference-counted pixel buffer passed between the
// similarity engine, the vision engine, and the processing pipeline.

use std::sync::{Arc, Weak};

use docscan_core::PixelFormat;
use docscan_core::error::DocscanError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat};
use tracing::{debug, info, instrument};

/// Shared handle to an in-memory image.
///
/// Moving a `RasterImage` transfers ownership of the buffer; dropping the last
/// handle releases it. `clone` shares the same buffer rather than copying
/// pixels, which is how a caller keeps the pre-pipeline original around for
/// fallback. Use [`RasterImage::same_buffer`] to ask whether two handles refer
/// to the same allocation.
#[derive(Clone)]
pub struct RasterImage {
    pixels: Arc<DynamicImage>,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Wrap an already-decoded image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            pixels: Arc::new(image),
        }
    }

    /// Wrap a single-channel buffer.
    pub fn from_gray(gray: GrayImage) -> Self {
        Self::new(DynamicImage::ImageLuma8(gray))
    }

    /// Decode an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, DocscanError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocscanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self::new(img))
    }

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocscanError> {
        let img = image::load_from_memory(data).map_err(|err| {
            DocscanError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self::new(img))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// An image with no pixels is treated the same as an absent one.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn format(&self) -> PixelFormat {
        match self.pixels.as_ref() {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => PixelFormat::Gray,
            _ => PixelFormat::Color,
        }
    }

    /// Borrow the decoded pixels.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Red, green and blue at `(x, y)`. Gray images report equal channels.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = self.pixels.get_pixel(x, y).0;
        [r, g, b]
    }

    /// Single-channel copy of the pixels.
    pub fn to_luma8(&self) -> GrayImage {
        self.pixels.to_luma8()
    }

    // -- Ownership ------------------------------------------------------------

    /// True when both handles refer to the same allocation.
    pub fn same_buffer(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// Weak observer that reports once every handle to this buffer is gone.
    pub fn probe(&self) -> ReleaseProbe {
        ReleaseProbe {
            buffer: Arc::downgrade(&self.pixels),
        }
    }

    // -- Resampling -----------------------------------------------------------

    /// Shrink by an integer `factor` on both axes using nearest-neighbour
    /// sampling. A factor of 0 or 1 returns the same buffer.
    pub fn downscaled(&self, factor: u32) -> RasterImage {
        if factor <= 1 || self.is_empty() {
            return self.clone();
        }
        let width = (self.width() / factor).max(1);
        let height = (self.height() / factor).max(1);
        debug!(factor, width, height, "Downscaling raster");
        Self::new(self.pixels.resize_exact(width, height, FilterType::Nearest))
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, DocscanError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| DocscanError::ImageError(format!("image encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), DocscanError> {
        self.pixels.save(path.as_ref()).map_err(|err| {
            DocscanError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .finish()
    }
}

/// Observes a buffer without keeping it alive.
#[derive(Debug, Clone)]
pub struct ReleaseProbe {
    buffer: Weak<DynamicImage>,
}

impl ReleaseProbe {
    /// True once no `RasterImage` handle refers to the buffer any more.
    pub fn is_released(&self) -> bool {
        self.buffer.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn clone_shares_the_buffer() {
        let a = RasterImage::from_gray(GrayImage::from_pixel(4, 4, Luma([9])));
        let b = a.clone();
        assert!(a.same_buffer(&b));

        let c = RasterImage::from_gray(GrayImage::from_pixel(4, 4, Luma([9])));
        assert!(!a.same_buffer(&c));
    }

    #[test]
    fn probe_reports_release_after_last_handle_drops() {
        let a = RasterImage::from_gray(GrayImage::new(2, 2));
        let probe = a.probe();
        let b = a.clone();
        drop(a);
        assert!(!probe.is_released());
        drop(b);
        assert!(probe.is_released());
    }

    #[test]
    fn format_and_channels() {
        let color = RasterImage::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            3,
            2,
            Rgb([10, 20, 30]),
        )));
        assert_eq!(color.format(), PixelFormat::Color);
        assert_eq!(color.rgb_at(1, 1), [10, 20, 30]);
        assert_eq!(color.pixel_count(), 6);

        let gray = RasterImage::from_gray(GrayImage::from_pixel(3, 2, Luma([77])));
        assert_eq!(gray.format(), PixelFormat::Gray);
        assert_eq!(gray.rgb_at(0, 0), [77, 77, 77]);
    }

    #[test]
    fn downscale_by_four() {
        let img = RasterImage::from_gray(GrayImage::new(400, 300));
        let small = img.downscaled(4);
        assert_eq!(small.dimensions(), (100, 75));
        assert!(img.downscaled(1).same_buffer(&img));

        let empty = RasterImage::from_gray(GrayImage::new(0, 0));
        assert!(empty.downscaled(4).is_empty());
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let img = RasterImage::from_gray(GrayImage::from_pixel(5, 7, Luma([128])));
        let bytes = img.to_png_bytes().unwrap();
        let decoded = RasterImage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (5, 7));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = RasterImage::from_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, DocscanError::ImageError(_)));
    }
}
