// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vision engine — the pixel-level primitives the pipeline is composed from.

pub mod detect;
pub mod engine;
pub mod threshold;

pub use engine::ImageprocEngine;

use docscan_core::error::Result;
use docscan_core::{BinarizeMethod, Quadrilateral};

use crate::raster::RasterImage;

/// Pixel kernels consumed by the pipeline and the capture flow.
///
/// Every operation borrows its input and returns a result buffer; inputs are
/// never modified in place. An operation with nothing to do may return a
/// clone of its input handle (the same buffer) instead of allocating.
pub trait VisionEngine: Send + Sync {
    /// Locate the document boundary. `Ok(None)` means no convincing
    /// quadrilateral was found.
    fn detect_quadrilateral(&self, image: &RasterImage) -> Result<Option<Quadrilateral>>;

    /// Warp the region bounded by `quad` onto an upright rectangle.
    fn perspective_crop(&self, image: &RasterImage, quad: &Quadrilateral) -> Result<RasterImage>;

    fn to_grayscale(&self, image: &RasterImage) -> Result<RasterImage>;

    /// Smooth sensor noise. `advanced` trades speed for edge preservation.
    fn denoise(&self, image: &RasterImage, advanced: bool) -> Result<RasterImage>;

    fn enhance_contrast(&self, image: &RasterImage) -> Result<RasterImage>;

    fn binarize(&self, image: &RasterImage, method: BinarizeMethod) -> Result<RasterImage>;

    /// Flatten uneven illumination so ink stands out from the page.
    fn separate_background(&self, image: &RasterImage) -> Result<RasterImage>;
}

/// Forward every operation through a pointer type.
macro_rules! forward_vision_engine {
    ($($ptr:ty),+) => {$(
        impl<E: VisionEngine + ?Sized> VisionEngine for $ptr {
            fn detect_quadrilateral(&self, image: &RasterImage) -> Result<Option<Quadrilateral>> {
                (**self).detect_quadrilateral(image)
            }

            fn perspective_crop(&self, image: &RasterImage, quad: &Quadrilateral) -> Result<RasterImage> {
                (**self).perspective_crop(image, quad)
            }

            fn to_grayscale(&self, image: &RasterImage) -> Result<RasterImage> {
                (**self).to_grayscale(image)
            }

            fn denoise(&self, image: &RasterImage, advanced: bool) -> Result<RasterImage> {
                (**self).denoise(image, advanced)
            }

            fn enhance_contrast(&self, image: &RasterImage) -> Result<RasterImage> {
                (**self).enhance_contrast(image)
            }

            fn binarize(&self, image: &RasterImage, method: BinarizeMethod) -> Result<RasterImage> {
                (**self).binarize(image, method)
            }

            fn separate_background(&self, image: &RasterImage) -> Result<RasterImage> {
                (**self).separate_background(image)
            }
        }
    )+};
}

forward_vision_engine!(&E, Box<E>, std::sync::Arc<E>);
