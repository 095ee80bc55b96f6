//! Edge-aware smoothing

use super::{clamp_channel, map_foreground, FilterPass};
use crate::rendering::{is_background, PixelBuffer};

/// 5x5 bilateral filter: neighbours are weighted by spatial distance and by
/// RGB distance, so smoothing stays inside a stroke.
#[derive(Debug, Clone, Copy)]
pub struct Bilateral {
    radius: i64,
    sigma_spatial: f32,
    sigma_range: f32,
}

impl Default for Bilateral {
    fn default() -> Self {
        Self {
            radius: 2,
            sigma_spatial: 2.0,
            sigma_range: 50.0,
        }
    }
}

impl FilterPass for Bilateral {
    fn name(&self) -> &'static str {
        "bilateral"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let spatial_denom = 2.0 * self.sigma_spatial * self.sigma_spatial;
        let range_denom = 2.0 * self.sigma_range * self.sigma_range;
        map_foreground(src, |x, y, px| {
            let mut acc = [0.0f32; 3];
            let mut total = 0.0f32;
            for dy in -self.radius..=self.radius {
                for dx in -self.radius..=self.radius {
                    let Some(n) = src.pixel_checked(x as i64 + dx, y as i64 + dy) else {
                        continue;
                    };
                    if is_background(n) {
                        continue;
                    }
                    let color_dist: f32 = (0..3)
                        .map(|c| {
                            let d = n[c] as f32 - px[c] as f32;
                            d * d
                        })
                        .sum();
                    let w = (-((dx * dx + dy * dy) as f32) / spatial_denom).exp()
                        * (-color_dist / range_denom).exp();
                    for c in 0..3 {
                        acc[c] += w * n[c] as f32;
                    }
                    total += w;
                }
            }
            [
                clamp_channel(acc[0] / total),
                clamp_channel(acc[1] / total),
                clamp_channel(acc[2] / total),
                px[3],
            ]
        })
    }
}
