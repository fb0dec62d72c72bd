//! Gaussian blur.

use crate::core::types::{FilterKind, ParameterName};
use crate::filters::registry::{Category, FilterDescriptor, FilterRegistry};
use image::RgbaImage;

/// Engine default blur radius.
pub const DEFAULT_RADIUS: f64 = 10.0;

/// Register blur filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(
        FilterDescriptor::builder(FilterKind::GaussianBlur)
            .description("Soften the image with a Gaussian blur")
            .category(Category::Blur)
            .accepts(ParameterName::Radius, "Standard deviation of the blur in pixels")
            .build(),
    );
}

/// Blur with a Gaussian of standard deviation `radius`.
///
/// A radius that is zero once narrowed to `f32` (or NaN) leaves the image
/// untouched.
pub fn gaussian_blur(image: &RgbaImage, radius: f64) -> RgbaImage {
    let sigma = radius as f32;
    if sigma.is_nan() || sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}
