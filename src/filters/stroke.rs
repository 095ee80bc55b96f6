//! Math stroke enhancement

use super::{clamp_channel, local_luma_stats, map_foreground, FilterPass, Kernel3};
use crate::rendering::PixelBuffer;

const STROKE_KERNEL: Kernel3 =
    Kernel3::new([[0.0, -0.25, 0.0], [-0.25, 2.0, -0.25], [0.0, -0.25, 0.0]]);

/// Weights at or below this leave the pixel untouched.
const MIN_STROKE_WEIGHT: f32 = 0.1;

/// Thickens thin, uniform strokes (fraction bars, radicals, hairline glyph
/// parts). The enhancement weight is high where the 3x3 neighbourhood has
/// little luminance variation.
#[derive(Debug, Clone, Copy)]
pub struct MathStroke {
    intensity: f32,
}

impl MathStroke {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity: intensity.max(0.0),
        }
    }
}

impl FilterPass for MathStroke {
    fn name(&self) -> &'static str {
        "math-stroke"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let (width, height) = src.dimensions();
        let lum = src.luminance_map();
        map_foreground(src, |x, y, px| {
            // the one-pixel border has no full neighbourhood
            if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
                return px;
            }
            let (min, max, _) = local_luma_stats(src, &lum, x, y);
            let stroke_strength = 1.0 - (max - min) / 255.0;
            let weight = stroke_strength * self.intensity;
            if weight <= MIN_STROKE_WEIGHT {
                return px;
            }

            let enhanced = STROKE_KERNEL.convolve_rgb(src, x, y, px);
            let mut out = [0u8; 4];
            for c in 0..3 {
                let v = px[c] as f32;
                out[c] = clamp_channel(v + weight * (enhanced[c] - v));
            }
            out[3] = px[3];
            out
        })
    }
}
