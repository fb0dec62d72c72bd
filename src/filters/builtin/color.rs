//! Color filters: sepia tone and hue rotation.

use super::to_channel;
use crate::core::types::{FilterKind, ParameterName};
use crate::filters::registry::{Category, FilterDescriptor, FilterRegistry};
use image::RgbaImage;
use rayon::prelude::*;

/// Engine default sepia strength.
pub const DEFAULT_INTENSITY: f64 = 1.0;
/// Engine default hue rotation in radians.
pub const DEFAULT_ANGLE: f64 = 0.0;

/// Register color filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(
        FilterDescriptor::builder(FilterKind::SepiaTone)
            .description("Tint the image in warm brown tones")
            .category(Category::Color)
            .accepts(ParameterName::Intensity, "Mix between original (0) and full sepia (1)")
            .build(),
    );
    registry.register(
        FilterDescriptor::builder(FilterKind::HueAdjust)
            .description("Rotate every hue around the color wheel")
            .category(Category::Color)
            .accepts(ParameterName::Angle, "Rotation in radians")
            .build(),
    );
}

/// Apply a 3x3 color matrix to every pixel, keeping alpha.
fn apply_matrix(image: &RgbaImage, m: [[f32; 3]; 3]) -> RgbaImage {
    let mut out = image.clone();
    let pixels: &mut [u8] = &mut out;

    pixels.par_chunks_mut(4).for_each(|px| {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        for (c, row) in m.iter().enumerate() {
            px[c] = to_channel(row[0] * r + row[1] * g + row[2] * b);
        }
    });

    out
}

/// Blend toward the classic sepia matrix by `intensity` (0 = unchanged).
pub fn sepia_tone(image: &RgbaImage, intensity: f64) -> RgbaImage {
    const SEPIA: [[f32; 3]; 3] = [
        [0.393, 0.769, 0.189],
        [0.349, 0.686, 0.168],
        [0.272, 0.534, 0.131],
    ];

    let t = intensity.clamp(0.0, 1.0) as f32;
    let mut m = [[0.0f32; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let identity = if i == j { 1.0 } else { 0.0 };
            *cell = identity + (SEPIA[i][j] - identity) * t;
        }
    }
    apply_matrix(image, m)
}

/// Rotate hue by `angle` radians, preserving luminance.
pub fn hue_adjust(image: &RgbaImage, angle: f64) -> RgbaImage {
    let (sin, cos) = (angle as f32).sin_cos();
    let m = [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ];
    apply_matrix(image, m)
}
