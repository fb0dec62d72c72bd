//! The filter engine seam.
//!
//! The pipeline treats the engine as a black box: given a kind, a source
//! image and the bound parameters, it returns an image or a failure.
//! [`BuiltinEngine`] is the implementation shipped with the crate.

use crate::core::error::EngineFailure;
use crate::core::types::{BoundParameters, FilterKind, ParameterName, SourceImage};
use crate::filters::builtin::{self, defaults};
use image::DynamicImage;

/// Default largest accepted image edge in pixels.
pub const DEFAULT_MAX_EXTENT: u32 = 16_384;

/// An image-processing capability invoked once per recompute.
///
/// Implementations must be deterministic: the same inputs always produce
/// the same pixels. They are called from background threads.
pub trait FilterEngine: Send + Sync {
    /// Apply `kind` to `image` with the given parameters.
    fn process(
        &self,
        kind: FilterKind,
        image: &SourceImage,
        parameters: &BoundParameters,
    ) -> Result<DynamicImage, EngineFailure>;
}

/// Engine built on the `image` and `imageproc` crates.
#[derive(Debug, Clone)]
pub struct BuiltinEngine {
    max_extent: u32,
}

impl BuiltinEngine {
    /// Create an engine with the default extent limit.
    pub fn new() -> Self {
        Self {
            max_extent: DEFAULT_MAX_EXTENT,
        }
    }

    /// Set the largest accepted image edge.
    pub fn with_max_extent(mut self, max_extent: u32) -> Self {
        self.max_extent = max_extent;
        self
    }

    /// Largest accepted image edge.
    pub fn max_extent(&self) -> u32 {
        self.max_extent
    }

    fn check_extent(&self, image: &SourceImage) -> Result<(), EngineFailure> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 || width > self.max_extent || height > self.max_extent {
            return Err(EngineFailure::UnsupportedExtent {
                width,
                height,
                max_extent: self.max_extent,
            });
        }
        Ok(())
    }
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine for BuiltinEngine {
    fn process(
        &self,
        kind: FilterKind,
        image: &SourceImage,
        parameters: &BoundParameters,
    ) -> Result<DynamicImage, EngineFailure> {
        self.check_extent(image)?;

        let rgba = image.image().to_rgba8();
        let intensity = |default| parameters.get_or(ParameterName::Intensity, default);
        let radius = |default| parameters.get_or(ParameterName::Radius, default);

        let result = match kind {
            FilterKind::Crystallize => builtin::crystallize(&rgba, radius(defaults::CRYSTAL_RADIUS)),
            FilterKind::Edges => builtin::edges(&rgba, intensity(defaults::EDGE_INTENSITY)),
            FilterKind::GaussianBlur => builtin::gaussian_blur(&rgba, radius(defaults::BLUR_RADIUS)),
            FilterKind::Pixellate => builtin::pixellate(
                &rgba,
                parameters.get_or(ParameterName::Scale, defaults::PIXEL_SCALE),
            ),
            FilterKind::SepiaTone => builtin::sepia_tone(&rgba, intensity(defaults::SEPIA_INTENSITY)),
            FilterKind::UnsharpMask => builtin::unsharp_mask(
                &rgba,
                radius(defaults::UNSHARP_RADIUS),
                intensity(defaults::UNSHARP_INTENSITY),
            ),
            FilterKind::Vignette => builtin::vignette(
                &rgba,
                intensity(defaults::VIGNETTE_INTENSITY),
                radius(defaults::VIGNETTE_RADIUS),
            ),
            FilterKind::HueAdjust => builtin::hue_adjust(
                &rgba,
                parameters.get_or(ParameterName::Angle, defaults::HUE_ANGLE),
            ),
        };

        Ok(DynamicImage::ImageRgba8(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterRegistry;
    use crate::core::types::ParameterSet;

    fn source(width: u32, height: u32) -> SourceImage {
        let pixels = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8, 255])
        });
        SourceImage::new(DynamicImage::ImageRgba8(pixels))
    }

    #[test]
    fn test_every_kind_renders() {
        let engine = BuiltinEngine::new();
        let registry = FilterRegistry::new();
        let params = ParameterSet::default();
        let image = source(24, 16);

        for kind in FilterKind::ALL {
            let bound = registry.bind(kind, &params);
            let out = engine.process(kind, &image, &bound).unwrap();
            assert_eq!((out.width(), out.height()), (24, 16), "{kind}");
        }
    }

    #[test]
    fn test_deterministic() {
        let engine = BuiltinEngine::new();
        let registry = FilterRegistry::new();
        let params = ParameterSet::default();
        let image = source(32, 32);

        for kind in FilterKind::ALL {
            let bound = registry.bind(kind, &params);
            let a = engine.process(kind, &image, &bound).unwrap();
            let b = engine.process(kind, &image, &bound).unwrap();
            assert_eq!(a.as_bytes(), b.as_bytes(), "{kind}");
        }
    }

    #[test]
    fn test_unbound_parameters_use_engine_defaults() {
        let engine = BuiltinEngine::new();
        let image = source(8, 8);
        let empty = BoundParameters::new();
        let mut explicit = BoundParameters::new();
        explicit.insert(ParameterName::Intensity, defaults::SEPIA_INTENSITY);

        let a = engine.process(FilterKind::SepiaTone, &image, &empty).unwrap();
        let b = engine.process(FilterKind::SepiaTone, &image, &explicit).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_oversized_extent_fails() {
        let engine = BuiltinEngine::new().with_max_extent(16);
        let err = engine
            .process(FilterKind::Edges, &source(17, 4), &BoundParameters::new())
            .unwrap_err();
        assert_eq!(
            err,
            EngineFailure::UnsupportedExtent {
                width: 17,
                height: 4,
                max_extent: 16
            }
        );
    }

    #[test]
    fn test_empty_image_fails() {
        let engine = BuiltinEngine::new();
        let empty = SourceImage::new(DynamicImage::new_rgba8(0, 0));
        assert!(engine
            .process(FilterKind::SepiaTone, &empty, &BoundParameters::new())
            .is_err());
    }
}
