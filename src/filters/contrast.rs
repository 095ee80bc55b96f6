//! Adaptive local contrast

use super::{clamp_channel, local_luma_stats, map_foreground, FilterPass};
use crate::rendering::PixelBuffer;

/// Stretches each pixel's luminance away from its 3x3 mean, more strongly
/// where the neighbourhood already has contrast. Hue is kept by scaling RGB
/// with a single ratio.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveContrast {
    amount: f32,
}

impl AdaptiveContrast {
    pub fn new(amount: f32) -> Self {
        Self { amount }
    }
}

impl FilterPass for AdaptiveContrast {
    fn name(&self) -> &'static str {
        "adaptive-contrast"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let lum = src.luminance_map();
        let width = src.width() as usize;
        map_foreground(src, |x, y, px| {
            let (min, max, avg) = local_luma_stats(src, &lum, x, y);
            let factor = 1.0 + self.amount * (max - min) / 255.0;
            let l = lum[y as usize * width + x as usize];
            let enhanced = avg + (l - avg) * factor;
            let ratio = if l > f32::EPSILON { enhanced / l } else { 1.0 };
            [
                clamp_channel(px[0] as f32 * ratio),
                clamp_channel(px[1] as f32 * ratio),
                clamp_channel(px[2] as f32 * ratio),
                px[3],
            ]
        })
    }
}
