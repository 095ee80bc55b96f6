//! Anti-aliasing passes: edge-preserving and vector-field

use super::{clamp_channel, map_foreground, neighbor_or, sample_bilinear, sobel, FilterPass, GAUSSIAN_3X3};
use crate::rendering::{is_background, PixelBuffer};

/// Sobel magnitude is divided by this before comparing with [`EDGE_CUTOFF`].
const SOBEL_NORMALIZER: f32 = 1000.0;
const EDGE_CUTOFF: f32 = 0.1;
const EDGE_SHARPEN_GAIN: f32 = 0.3;
/// Luminance sigma of the range weight used in smooth regions
const RANGE_SIGMA: f32 = 25.0;

/// Sharpens along strong edges and smooths flat regions with a
/// luminance-aware Gaussian, so anti-aliasing never crosses a stroke
/// boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgePreservingAa;

impl FilterPass for EdgePreservingAa {
    fn name(&self) -> &'static str {
        "edge-preserving-aa"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let (width, height) = src.dimensions();
        let lum = src.luminance_map();
        map_foreground(src, |x, y, px| {
            let (gx, gy) = sobel(&lum, width, height, x, y);
            let strength = ((gx * gx + gy * gy).sqrt() / SOBEL_NORMALIZER).min(1.0);
            let (xi, yi) = (x as i64, y as i64);

            let mut out = [0u8; 4];
            if strength > EDGE_CUTOFF {
                let cross = [
                    neighbor_or(src, xi, yi - 1, px),
                    neighbor_or(src, xi, yi + 1, px),
                    neighbor_or(src, xi - 1, yi, px),
                    neighbor_or(src, xi + 1, yi, px),
                ];
                for c in 0..3 {
                    let v = px[c] as f32;
                    let avg = cross.iter().map(|n| n[c] as f32).sum::<f32>() / 4.0;
                    out[c] = clamp_channel(v + (v - avg) * EDGE_SHARPEN_GAIN * strength);
                }
            } else {
                let center_lum = lum[(y * width + x) as usize];
                let mut acc = [0.0f32; 3];
                let mut total = 0.0f32;
                let mut k = 0;
                for dy in -1..=1i64 {
                    for dx in -1..=1i64 {
                        let spatial = GAUSSIAN_3X3[k];
                        k += 1;
                        let Some(n) = src.pixel_checked(xi + dx, yi + dy) else {
                            continue;
                        };
                        if is_background(n) {
                            continue;
                        }
                        let diff = lum[((yi + dy) * width as i64 + xi + dx) as usize] - center_lum;
                        let w = spatial * (-(diff * diff) / (2.0 * RANGE_SIGMA * RANGE_SIGMA)).exp();
                        for c in 0..3 {
                            acc[c] += w * n[c] as f32;
                        }
                        total += w;
                    }
                }
                for c in 0..3 {
                    out[c] = clamp_channel(acc[c] / total);
                }
            }
            out[3] = px[3];
            out
        })
    }
}

/// Minimum Sobel magnitude for a pixel to carry a direction
const FIELD_MAGNITUDE_MIN: f32 = 10.0;
/// Offsets along the tangent at which the source is resampled
const TANGENT_OFFSETS: [f32; 4] = [-1.0, -0.5, 0.5, 1.0];

/// Smooths along stroke direction: samples are taken on the line tangent to
/// the local gradient and blended back by `intensity`.
#[derive(Debug, Clone, Copy)]
pub struct VectorFieldAa {
    intensity: f32,
}

impl VectorFieldAa {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity: intensity.clamp(0.0, 1.0),
        }
    }
}

impl FilterPass for VectorFieldAa {
    fn name(&self) -> &'static str {
        "vector-field-aa"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let (width, height) = src.dimensions();
        let lum = src.luminance_map();
        let angles: Vec<Option<f32>> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let (gx, gy) = sobel(&lum, width, height, x, y);
                ((gx * gx + gy * gy).sqrt() > FIELD_MAGNITUDE_MIN).then(|| gy.atan2(gx))
            })
            .collect();

        map_foreground(src, |x, y, px| {
            let Some(theta) = angles[(y * width + x) as usize] else {
                return px;
            };
            let (tx, ty) = (-theta.sin(), theta.cos());
            let mut avg = [0.0f32; 4];
            for t in TANGENT_OFFSETS {
                let s = sample_bilinear(src, x as f32 + tx * t, y as f32 + ty * t);
                for c in 0..4 {
                    avg[c] += s[c] / TANGENT_OFFSETS.len() as f32;
                }
            }
            let mut out = [0u8; 4];
            for c in 0..4 {
                out[c] = clamp_channel(px[c] as f32 * (1.0 - self.intensity) + avg[c] * self.intensity);
            }
            out
        })
    }
}
