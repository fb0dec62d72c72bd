//! Edge detection.

use super::to_channel;
use crate::core::types::{FilterKind, ParameterName};
use crate::filters::registry::{Category, FilterDescriptor, FilterRegistry};
use image::RgbaImage;
use rayon::prelude::*;

/// Engine default edge gain.
pub const DEFAULT_INTENSITY: f64 = 1.0;

const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Register edge filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(
        FilterDescriptor::builder(FilterKind::Edges)
            .description("Highlight edges in color, dark everywhere else")
            .category(Category::Edge)
            .accepts(ParameterName::Intensity, "Gain applied to the edge magnitude")
            .build(),
    );
}

/// Per-channel Sobel magnitude scaled by `intensity`.
///
/// Borders are clamped to the nearest pixel; alpha is preserved.
pub fn edges(image: &RgbaImage, intensity: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width == 0 || height == 0 {
        return out;
    }

    let gain = intensity as f32;
    let row_len = width as usize * 4;
    let pixels: &mut [u8] = &mut out;

    pixels
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..width as i64 {
                let mut gx = [0i32; 3];
                let mut gy = [0i32; 3];

                for ky in -1i64..=1 {
                    for kx in -1i64..=1 {
                        let px = (x + kx).clamp(0, width as i64 - 1) as u32;
                        let py = (y + ky).clamp(0, height as i64 - 1) as u32;
                        let pixel = image.get_pixel(px, py);
                        let ki = ((ky + 1) * 3 + (kx + 1)) as usize;
                        for c in 0..3 {
                            gx[c] += pixel[c] as i32 * SOBEL_X[ki];
                            gy[c] += pixel[c] as i32 * SOBEL_Y[ki];
                        }
                    }
                }

                let offset = x as usize * 4;
                for c in 0..3 {
                    let magnitude = ((gx[c] * gx[c] + gy[c] * gy[c]) as f32).sqrt();
                    row[offset + c] = to_channel(magnitude * gain);
                }
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtin::fixtures;

    #[test]
    fn test_flat_image_has_no_edges() {
        let image = fixtures::solid(6, 6, [200, 10, 90, 255]);
        let result = edges(&image, 1.0);
        assert!(result.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0 && p[3] == 255));
    }

    #[test]
    fn test_step_is_detected() {
        let image = fixtures::gradient(20, 6);
        let result = edges(&image, 1.0);
        // Blue steps at x = 10
        assert_eq!(result.get_pixel(10, 3)[2], 255);
        assert_eq!(result.get_pixel(3, 3)[2], 0);
    }

    #[test]
    fn test_zero_intensity_is_black() {
        let image = fixtures::gradient(8, 8);
        let result = edges(&image, 0.0);
        assert!(result.pixels().all(|p| p[0] == 0 && p[1] == 0 && p[2] == 0));
    }
}
