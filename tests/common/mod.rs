#![allow(dead_code)]

use eqraster::PixelBuffer;

/// Reference luminance, written out independently of the crate's helper.
pub fn reference_luminance(px: [u8; 4]) -> f64 {
    0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64
}

/// A dark glyph-like shape on a transparent background: a fraction bar, a
/// one-pixel vertical stem with a faded middle, a diagonal and a soft
/// anti-aliased blob.
pub fn synthetic_glyphs(width: u32, height: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height);
    let bar_y = height / 2;
    for x in 2..width.saturating_sub(2) {
        buf.set_pixel(x, bar_y, [20, 20, 30, 255]);
        buf.set_pixel(x, bar_y + 1, [20, 20, 30, 140]);
    }
    for y in 1..bar_y.saturating_sub(1) {
        let alpha = if y % 3 == 0 { 120 } else { 220 };
        buf.set_pixel(width / 4, y, [10, 10, 10, alpha]);
    }
    for i in 0..(height / 3) {
        let (x, y) = (width / 2 + i, bar_y + 2 + i);
        if x < width && y < height {
            buf.set_pixel(x, y, [200, 40, 40, 230]);
        }
    }
    for y in 0..height {
        for x in (3 * width / 4)..width {
            let dx = x as f64 - (7 * width / 8) as f64;
            let dy = y as f64 - (height / 4) as f64;
            let d = (dx * dx + dy * dy).sqrt();
            if d < 4.0 {
                let a = (255.0 * (1.0 - d / 4.0)).round() as u8;
                buf.set_pixel(x, y, [60, 90, 160, a]);
            }
        }
    }
    // a few near-transparent specks that must survive untouched
    buf.set_pixel(0, 0, [250, 0, 0, 5]);
    buf.set_pixel(width - 1, height - 1, [0, 250, 0, 9]);
    buf
}

/// Every option enabled, with edge-of-range values.
pub fn all_filters() -> eqraster::FilterOptions {
    eqraster::FilterOptions {
        edge_enhance: true,
        edge_type: eqraster::EdgeType::BlackHat,
        edge_radius: 2,
        math_stroke: true,
        stroke_intensity: 2.0,
        bilateral_filter: true,
        glyph_alignment_correction: true,
        glyph_threshold: 0.3,
        subpixel_hinting: true,
        adaptive_contrast: true,
        contrast_amount: 2.0,
        symbol_recognition: true,
        vector_field_aa: false,
        vfaa_intensity: 1.0,
        supersample_factor: 1,
    }
}
