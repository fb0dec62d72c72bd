//! Unsharp mask.

use super::{blur, to_channel};
use crate::core::types::{FilterKind, ParameterName};
use crate::filters::registry::{Category, FilterDescriptor, FilterRegistry};
use image::RgbaImage;
use rayon::prelude::*;

/// Engine default blur radius for the mask.
pub const DEFAULT_RADIUS: f64 = 2.5;
/// Engine default sharpening amount.
pub const DEFAULT_INTENSITY: f64 = 0.5;

/// Register sharpening filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(
        FilterDescriptor::builder(FilterKind::UnsharpMask)
            .description("Increase contrast along edges by subtracting a blurred copy")
            .category(Category::Sharpen)
            .accepts(ParameterName::Radius, "Radius of the blurred copy in pixels")
            .accepts(ParameterName::Intensity, "How strongly the difference is added back")
            .build(),
    );
}

/// Sharpen: `out = orig + (orig - blur(orig, radius)) * intensity`.
///
/// Alpha is taken from the original.
pub fn unsharp_mask(image: &RgbaImage, radius: f64, intensity: f64) -> RgbaImage {
    let blurred = blur::gaussian_blur(image, radius);
    let amount = intensity as f32;

    let mut out = image.clone();
    let pixels: &mut [u8] = &mut out;
    let soft: &[u8] = &blurred;

    pixels
        .par_chunks_mut(4)
        .zip(soft.par_chunks(4))
        .for_each(|(px, b)| {
            for c in 0..3 {
                let o = px[c] as f32;
                px[c] = to_channel(o + (o - b[c] as f32) * amount);
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtin::fixtures;

    #[test]
    fn test_zero_intensity_is_identity() {
        let image = fixtures::gradient(16, 16);
        assert_eq!(unsharp_mask(&image, 3.0, 0.0), image);
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let image = fixtures::gradient(16, 16);
        assert_eq!(unsharp_mask(&image, 0.0, 1.0), image);
    }

    #[test]
    fn test_tiny_radius_is_identity() {
        let image = fixtures::gradient(8, 8);
        assert_eq!(unsharp_mask(&image, 1e-46, 1.0), image);
    }

    #[test]
    fn test_sharpening_increases_edge_contrast() {
        let image = fixtures::gradient(32, 8);
        let sharp = unsharp_mask(&image, 2.0, 1.0);
        // Just left of the blue step darkens, just right brightens
        assert!(sharp.get_pixel(15, 4)[2] < 30);
        assert!(sharp.get_pixel(16, 4)[2] > 220);
    }
}
