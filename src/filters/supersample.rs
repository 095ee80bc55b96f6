//! Supersample resolve

use crate::rendering::PixelBuffer;

/// Downsample a buffer rendered at `factor` times the target size.
///
/// Each output pixel is the box average of its `factor x factor` source
/// block. Color channels are weighted by alpha so transparent samples do not
/// darken the edges of strokes.
pub fn resolve(src: &PixelBuffer, factor: u32) -> PixelBuffer {
    if factor <= 1 {
        return src.clone();
    }
    let (src_w, src_h) = src.dimensions();
    let width = (src_w / factor).max(1);
    let height = (src_h / factor).max(1);
    let mut dst = PixelBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut rgb = [0.0f64; 3];
            let mut alpha = 0.0f64;
            let mut samples = 0u32;
            for sy in (y * factor)..((y + 1) * factor).min(src_h) {
                for sx in (x * factor)..((x + 1) * factor).min(src_w) {
                    let px = src.pixel(sx, sy);
                    let a = px[3] as f64;
                    for c in 0..3 {
                        rgb[c] += px[c] as f64 * a;
                    }
                    alpha += a;
                    samples += 1;
                }
            }
            if samples == 0 {
                continue;
            }
            let out = if alpha > 0.0 {
                [
                    (rgb[0] / alpha).round().clamp(0.0, 255.0) as u8,
                    (rgb[1] / alpha).round().clamp(0.0, 255.0) as u8,
                    (rgb[2] / alpha).round().clamp(0.0, 255.0) as u8,
                    (alpha / samples as f64).round().clamp(0.0, 255.0) as u8,
                ]
            } else {
                [0, 0, 0, 0]
            };
            dst.set_pixel(x, y, out);
        }
    }
    dst
}
