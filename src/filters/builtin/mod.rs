//! Built-in filter kernels.
//!
//! Each submodule registers the descriptors for the kinds it implements and
//! exposes plain `RgbaImage -> RgbaImage` kernels that the
//! [`BuiltinEngine`](crate::filters::BuiltinEngine) dispatches to.

mod blur;
mod color;
mod edge;
mod sharpen;
mod stylize;

use crate::filters::registry::FilterRegistry;

/// Register all built-in filters.
pub fn register_all(registry: &mut FilterRegistry) {
    stylize::register(registry);
    edge::register(registry);
    blur::register(registry);
    color::register(registry);
    sharpen::register(registry);
}

// Re-export for direct access
pub use blur::gaussian_blur;
pub use color::{hue_adjust, sepia_tone};
pub use edge::edges;
pub use sharpen::unsharp_mask;
pub use stylize::{crystallize, pixellate, vignette};

/// Engine-side defaults used when a parameter is not bound.
pub mod defaults {
    pub use super::blur::DEFAULT_RADIUS as BLUR_RADIUS;
    pub use super::color::{DEFAULT_ANGLE as HUE_ANGLE, DEFAULT_INTENSITY as SEPIA_INTENSITY};
    pub use super::edge::DEFAULT_INTENSITY as EDGE_INTENSITY;
    pub use super::sharpen::{DEFAULT_INTENSITY as UNSHARP_INTENSITY, DEFAULT_RADIUS as UNSHARP_RADIUS};
    pub use super::stylize::{
        DEFAULT_CRYSTAL_RADIUS as CRYSTAL_RADIUS, DEFAULT_PIXEL_SCALE as PIXEL_SCALE,
        DEFAULT_VIGNETTE_INTENSITY as VIGNETTE_INTENSITY,
        DEFAULT_VIGNETTE_RADIUS as VIGNETTE_RADIUS,
    };
}

/// Round and clamp a channel value back into `u8`.
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{Rgba, RgbaImage};

    /// A small image with a gradient and a hard vertical edge.
    pub fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = if x < width / 2 { 30 } else { 220 };
            Rgba([r, g, b, 255])
        })
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }
}
