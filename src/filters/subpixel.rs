//! RGB-striped subpixel hinting simulation

use super::{clamp_channel, map_foreground, neighbor_or, FilterPass};
use crate::rendering::PixelBuffer;

/// Horizontal taps at offsets `-3..=2`
const TAPS: usize = 6;
const FIRST_TAP: i64 = -3;
/// Half-width of the triangular reconstruction filter, in pixels
const FILTER_RADIUS: f32 = 3.0;
/// Subpixel stripe offsets for R, G and B
const CHANNEL_SHIFT: [f32; 3] = [-1.0 / 3.0, 0.0, 1.0 / 3.0];

/// Filters each color channel with its own horizontally shifted kernel, as
/// if the panel had RGB stripes. Alpha is untouched, and the three columns
/// on each side are left as they are.
#[derive(Debug, Clone)]
pub struct SubpixelHinting {
    kernels: [[f32; TAPS]; 3],
}

impl SubpixelHinting {
    pub fn new() -> Self {
        Self {
            kernels: CHANNEL_SHIFT.map(channel_kernel),
        }
    }
}

impl Default for SubpixelHinting {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized triangular kernel centred on `shift`.
fn channel_kernel(shift: f32) -> [f32; TAPS] {
    let mut kernel = [0.0f32; TAPS];
    for (i, w) in kernel.iter_mut().enumerate() {
        let offset = (FIRST_TAP + i as i64) as f32;
        *w = (1.0 - (offset - shift).abs() / FILTER_RADIUS).max(0.0);
    }
    let sum: f32 = kernel.iter().sum();
    for w in kernel.iter_mut() {
        *w /= sum;
    }
    kernel
}

impl FilterPass for SubpixelHinting {
    fn name(&self) -> &'static str {
        "subpixel-hinting"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let width = src.width();
        let margin = (-FIRST_TAP) as u32;
        map_foreground(src, |x, y, px| {
            if x < margin || x + margin >= width {
                return px;
            }
            let mut out = [0u8; 4];
            for (c, kernel) in self.kernels.iter().enumerate() {
                let mut acc = 0.0f32;
                for (i, w) in kernel.iter().enumerate() {
                    let n = neighbor_or(src, x as i64 + FIRST_TAP + i as i64, y as i64, px);
                    acc += w * n[c] as f32;
                }
                out[c] = clamp_channel(acc);
            }
            out[3] = px[3];
            out
        })
    }
}
