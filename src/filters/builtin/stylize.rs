//! Stylizing filters: crystallize, pixellate, vignette.

use super::to_channel;
use crate::core::types::{FilterKind, ParameterName};
use crate::filters::registry::{Category, FilterDescriptor, FilterRegistry};
use image::RgbaImage;
use rayon::prelude::*;

/// Engine default crystal cell size.
pub const DEFAULT_CRYSTAL_RADIUS: f64 = 20.0;
/// Engine default pixel block size.
pub const DEFAULT_PIXEL_SCALE: f64 = 8.0;
/// Engine default vignette darkening at the corners.
pub const DEFAULT_VIGNETTE_INTENSITY: f64 = 0.5;
/// Engine default untouched radius around the centre, in pixels.
pub const DEFAULT_VIGNETTE_RADIUS: f64 = 100.0;

/// Register stylizing filters.
pub fn register(registry: &mut FilterRegistry) {
    registry.register(
        FilterDescriptor::builder(FilterKind::Crystallize)
            .description("Break the image into flat polygonal color cells")
            .category(Category::Stylize)
            .accepts(ParameterName::Radius, "Approximate cell size in pixels")
            .build(),
    );
    registry.register(
        FilterDescriptor::builder(FilterKind::Pixellate)
            .description("Replace the image with square blocks of averaged color")
            .category(Category::Stylize)
            .accepts(ParameterName::Scale, "Block edge length in pixels")
            .build(),
    );
    registry.register(
        FilterDescriptor::builder(FilterKind::Vignette)
            .description("Darken the image toward its corners")
            .category(Category::Stylize)
            .accepts(ParameterName::Intensity, "Darkening at the corners")
            .accepts(ParameterName::Radius, "Untouched radius around the centre in pixels")
            .build(),
    );
}

/// Round a size parameter to a whole number of pixels, at least one.
fn cell_size(value: f64) -> u32 {
    if value.is_nan() {
        return 1;
    }
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

/// SplitMix64 finaliser, used to jitter crystal seeds deterministically.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed point of grid cell `(cx, cy)`, somewhere inside the cell.
fn seed(cx: u32, cy: u32, cell: u32, width: u32, height: u32) -> (u32, u32) {
    let h = mix(((cx as u64) << 32) | cy as u64);
    let jx = (h % cell as u64) as u32;
    let jy = ((h >> 32) % cell as u64) as u32;
    let x = (cx as u64 * cell as u64 + jx as u64).min(width as u64 - 1) as u32;
    let y = (cy as u64 * cell as u64 + jy as u64).min(height as u64 - 1) as u32;
    (x, y)
}

/// Paint each pixel with the color of the nearest seed on a jittered grid.
///
/// Only the 3x3 neighbourhood of grid cells is searched, so cells are
/// Voronoi-like rather than exact.
pub fn crystallize(image: &RgbaImage, radius: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let cell = cell_size(radius);
    if width == 0 || height == 0 || cell == 1 {
        return image.clone();
    }

    let cols = width.div_ceil(cell);
    let rows = height.div_ceil(cell);
    let seeds: Vec<(u32, u32)> = (0..rows)
        .flat_map(|cy| (0..cols).map(move |cx| seed(cx, cy, cell, width, height)))
        .collect();

    let mut out = image.clone();
    let row_len = width as usize * 4;
    let pixels: &mut [u8] = &mut out;

    pixels
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let cy = y / cell;
            for x in 0..width {
                let cx = x / cell;
                let mut best = (u64::MAX, (x, y));

                for ny in cy.saturating_sub(1)..=(cy + 1).min(rows - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(cols - 1) {
                        let (sx, sy) = seeds[(ny * cols + nx) as usize];
                        let dx = sx as i64 - x as i64;
                        let dy = sy as i64 - y as i64;
                        let d = (dx * dx + dy * dy) as u64;
                        if d < best.0 {
                            best = (d, (sx, sy));
                        }
                    }
                }

                let (sx, sy) = best.1;
                let offset = x as usize * 4;
                row[offset..offset + 4].copy_from_slice(&image.get_pixel(sx, sy).0);
            }
        });

    out
}

/// Average the image over `scale x scale` blocks.
pub fn pixellate(image: &RgbaImage, scale: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let block = cell_size(scale);
    if width == 0 || height == 0 || block == 1 {
        return image.clone();
    }

    let mut out = image.clone();
    let row_len = width as usize * 4;
    let band_len = row_len * block.min(height) as usize;
    let pixels: &mut [u8] = &mut out;

    pixels
        .par_chunks_mut(band_len)
        .enumerate()
        .for_each(|(band, chunk)| {
            let y0 = band as u32 * block;
            let rows = (chunk.len() / row_len) as u32;

            let mut x0 = 0;
            while x0 < width {
                let x1 = (x0 + block).min(width);
                let mut sum = [0u64; 4];
                for y in y0..y0 + rows {
                    for x in x0..x1 {
                        let p = image.get_pixel(x, y);
                        for c in 0..4 {
                            sum[c] += p[c] as u64;
                        }
                    }
                }

                let count = ((x1 - x0) * rows) as u64;
                let avg = sum.map(|s| ((s + count / 2) / count) as u8);
                for y in 0..rows {
                    for x in x0..x1 {
                        let offset = y as usize * row_len + x as usize * 4;
                        chunk[offset..offset + 4].copy_from_slice(&avg);
                    }
                }
                x0 = x1;
            }
        });

    out
}

/// Darken quadratically from `radius` pixels out to `1 - intensity` at the corners.
pub fn vignette(image: &RgbaImage, intensity: f64, radius: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_distance = cx.hypot(cy);
    let inner = radius.max(0.0) as f32;
    if width == 0 || height == 0 || max_distance <= inner {
        return image.clone();
    }

    let strength = intensity as f32;
    let span = max_distance - inner;
    let row_len = width as usize * 4;
    let mut out = image.clone();
    let pixels: &mut [u8] = &mut out;

    pixels
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for x in 0..width as usize {
                let dx = x as f32 + 0.5 - cx;
                let t = ((dx.hypot(dy) - inner) / span).clamp(0.0, 1.0);
                let factor = 1.0 - strength * t * t;
                let px = &mut row[x * 4..x * 4 + 3];
                for channel in px.iter_mut() {
                    *channel = to_channel(*channel as f32 * factor);
                }
            }
        });

    out
}
