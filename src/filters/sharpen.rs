//! Luminance-preserving text sharpening and contrast-adaptive sharpening

use super::{clamp_channel, local_luma_stats, map_foreground, FilterPass, Kernel3, GAUSSIAN_3X3};
use crate::rendering::{is_background, luminance_rgb, pixel_luminance, PixelBuffer};

const TEXT_SHARPEN_KERNEL: Kernel3 =
    Kernel3::new([[0.0, -0.5, 0.0], [-0.5, 3.0, -0.5], [0.0, -0.5, 0.0]]);

/// Below this, sharpening is skipped entirely.
const MIN_SHARPEN_AMOUNT: f32 = 0.05;
const MAX_SHARPEN_AMOUNT: f32 = 0.7;

/// Sharpens glyph edges while keeping each pixel's hue: the kernel result
/// only contributes its luminance, which rescales the original color.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSharpen;

impl FilterPass for TextSharpen {
    fn name(&self) -> &'static str {
        "text-sharpen"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        map_foreground(src, |x, y, px| {
            let convolved = TEXT_SHARPEN_KERNEL.convolve_rgb(src, x, y, px);
            let old_lum = pixel_luminance(px);
            let new_lum = luminance_rgb(convolved);
            let rgb = if old_lum > f32::EPSILON {
                let scale = new_lum / old_lum;
                [px[0] as f32 * scale, px[1] as f32 * scale, px[2] as f32 * scale]
            } else {
                convolved
            };
            [
                clamp_channel(rgb[0]),
                clamp_channel(rgb[1]),
                clamp_channel(rgb[2]),
                px[3],
            ]
        })
    }
}

/// Sharpening whose strength falls off with local contrast, so flat regions
/// get crisper while already-hard edges are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContrastAdaptiveSharpen;

impl FilterPass for ContrastAdaptiveSharpen {
    fn name(&self) -> &'static str {
        "contrast-adaptive-sharpen"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let lum = src.luminance_map();
        let width = src.width() as usize;
        map_foreground(src, |x, y, px| {
            let (min, max, _) = local_luma_stats(src, &lum, x, y);
            let contrast = (max - min) / 255.0;
            let amount = MAX_SHARPEN_AMOUNT * (1.0 - contrast);
            if amount <= MIN_SHARPEN_AMOUNT {
                return px;
            }

            let blurred = gaussian_blur_rgb(src, x, y);
            let center_lum = lum[y as usize * width + x as usize];
            let blur_lum = luminance_rgb(blurred);

            let mut out = [0u8; 4];
            for c in 0..3 {
                let v = px[c] as f32;
                let reference = if center_lum > f32::EPSILON {
                    v * blur_lum / center_lum
                } else {
                    blurred[c]
                };
                out[c] = clamp_channel(v + amount * (v - reference));
            }
            out[3] = px[3];
            out
        })
    }
}

/// Gaussian-weighted RGB mean over foreground pixels of the 3x3 window.
fn gaussian_blur_rgb(src: &PixelBuffer, x: u32, y: u32) -> [f32; 3] {
    let mut acc = [0.0f32; 3];
    let mut total = 0.0f32;
    let mut k = 0;
    for dy in -1..=1i64 {
        for dx in -1..=1i64 {
            let w = GAUSSIAN_3X3[k];
            k += 1;
            let Some(px) = src.pixel_checked(x as i64 + dx, y as i64 + dy) else {
                continue;
            };
            if is_background(px) {
                continue;
            }
            for c in 0..3 {
                acc[c] += w * px[c] as f32;
            }
            total += w;
        }
    }
    if total > 0.0 {
        for v in acc.iter_mut() {
            *v /= total;
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_sharpen_keeps_flat_regions() {
        let src = PixelBuffer::filled(5, 5, [90, 140, 30, 255]);
        assert_eq!(TextSharpen.apply(&src), src);
    }

    #[test]
    fn text_sharpen_preserves_hue_ratio() {
        let mut src = PixelBuffer::filled(5, 5, [40, 40, 40, 255]);
        src.set_pixel(2, 2, [200, 100, 50, 255]);
        let out = TextSharpen.apply(&src).pixel(2, 2);
        // brighter than the surroundings, so it is pushed further up
        assert!(out[0] > 200);
        assert!(out[0] >= out[1] && out[1] >= out[2]);
    }

    #[test]
    fn text_sharpen_black_center_uses_kernel_directly() {
        let mut src = PixelBuffer::filled(3, 3, [100, 100, 100, 255]);
        src.set_pixel(1, 1, [0, 0, 0, 255]);
        // 3*0 - 4*0.5*100 clamps to zero
        assert_eq!(TextSharpen.apply(&src).pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn cas_is_identity_on_flat_input() {
        let src = PixelBuffer::filled(4, 4, [12, 200, 99, 180]);
        assert_eq!(ContrastAdaptiveSharpen.apply(&src), src);
    }

    #[test]
    fn cas_skips_high_contrast_pixels() {
        let mut src = PixelBuffer::filled(3, 3, [255, 255, 255, 255]);
        src.set_pixel(1, 1, [0, 0, 0, 255]);
        let out = ContrastAdaptiveSharpen.apply(&src);
        assert_eq!(out.pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn cas_pushes_away_from_blur() {
        let mut src = PixelBuffer::filled(3, 3, [100, 100, 100, 255]);
        src.set_pixel(1, 1, [120, 120, 120, 255]);
        let out = ContrastAdaptiveSharpen.apply(&src);
        assert!(out.pixel(1, 1)[0] > 120);
    }
}
