//! Glyph alignment correction

use super::{map_foreground, FilterPass};
use crate::rendering::{PixelBuffer, BACKGROUND_ALPHA};

/// Snaps partially faded pixels of one-pixel-wide vertical stems to full
/// opacity.
///
/// A stem pixel has foreground directly above and below it and is more
/// opaque than both its left and right neighbours. Pixels outside the
/// buffer count as transparent.
#[derive(Debug, Clone, Copy)]
pub struct GlyphAlignment {
    threshold: f32,
}

impl GlyphAlignment {
    /// `threshold` is the normalized alpha (0-1) a stem pixel must exceed.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }
}

impl FilterPass for GlyphAlignment {
    fn name(&self) -> &'static str {
        "glyph-alignment"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let alpha_at = |x: i64, y: i64| src.pixel_checked(x, y).map_or(0, |p| p[3]);
        map_foreground(src, |x, y, px| {
            let alpha = px[3];
            if alpha == u8::MAX {
                return px;
            }
            let (x, y) = (x as i64, y as i64);
            let is_stem = alpha_at(x, y - 1) >= BACKGROUND_ALPHA
                && alpha_at(x, y + 1) >= BACKGROUND_ALPHA
                && alpha_at(x - 1, y) < alpha
                && alpha_at(x + 1, y) < alpha;
            if is_stem && alpha as f32 / 255.0 > self.threshold {
                [px[0], px[1], px[2], u8::MAX]
            } else {
                px
            }
        })
    }
}
