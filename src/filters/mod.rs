//! Post-processing filter pipeline
//!
//! Every pass reads a source buffer and writes a fresh destination buffer;
//! no pass reads pixels it has already written. Background pixels (alpha
//! below [`BACKGROUND_ALPHA`](crate::rendering::BACKGROUND_ALPHA)) are copied
//! through unchanged by every pass, and all outputs are rounded then clamped
//! to `0..=255`.

mod antialias;
mod bilateral;
mod contrast;
mod glyph;
mod morphology;
mod sharpen;
mod stroke;
mod subpixel;
mod supersample;
mod symbol;

pub use antialias::{EdgePreservingAa, VectorFieldAa};
pub use bilateral::Bilateral;
pub use contrast::AdaptiveContrast;
pub use glyph::GlyphAlignment;
pub use morphology::MorphologicalEdge;
pub use sharpen::{ContrastAdaptiveSharpen, TextSharpen};
pub use stroke::MathStroke;
pub use subpixel::SubpixelHinting;
pub use supersample::resolve as resolve_supersampled;
pub use symbol::SymbolRecognition;

use crate::options::FilterOptions;
use crate::rendering::{is_background, PixelBuffer};
use std::time::Instant;

/// One stage of the post-processing pipeline.
pub trait FilterPass: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Produce a new buffer of the same dimensions from `src`.
    fn apply(&self, src: &PixelBuffer) -> PixelBuffer;
}

/// Ordered list of passes selected from [`FilterOptions`].
pub struct Pipeline {
    supersample_factor: u32,
    passes: Vec<Box<dyn FilterPass>>,
}

impl Pipeline {
    /// Build the pipeline for `options`.
    ///
    /// Order: supersample resolve, math stroke, symbol recognition, subpixel
    /// hinting, text sharpening, anti-aliasing (vector-field when selected,
    /// edge-preserving otherwise), contrast-adaptive sharpening, morphological
    /// edge enhancement, bilateral filter, glyph alignment, adaptive contrast.
    pub fn from_options(options: &FilterOptions) -> Self {
        let opts = options.normalized();
        let mut passes: Vec<Box<dyn FilterPass>> = Vec::new();

        if opts.math_stroke {
            passes.push(Box::new(MathStroke::new(opts.stroke_intensity)));
        }
        if opts.symbol_recognition {
            passes.push(Box::new(SymbolRecognition));
        }
        if opts.subpixel_hinting {
            passes.push(Box::new(SubpixelHinting::new()));
        }
        passes.push(Box::new(TextSharpen));
        if opts.vector_field_aa {
            passes.push(Box::new(VectorFieldAa::new(opts.vfaa_intensity)));
        } else {
            passes.push(Box::new(EdgePreservingAa));
        }
        passes.push(Box::new(ContrastAdaptiveSharpen));
        if opts.edge_enhance {
            passes.push(Box::new(MorphologicalEdge::new(opts.edge_type, opts.edge_radius)));
        }
        if opts.bilateral_filter {
            passes.push(Box::new(Bilateral::default()));
        }
        if opts.glyph_alignment_correction {
            passes.push(Box::new(GlyphAlignment::new(opts.glyph_threshold)));
        }
        if opts.adaptive_contrast {
            passes.push(Box::new(AdaptiveContrast::new(opts.contrast_amount)));
        }

        Self {
            supersample_factor: opts.supersample_factor,
            passes,
        }
    }

    /// A pipeline running exactly `passes`, without supersample resolve.
    pub fn with_passes(passes: Vec<Box<dyn FilterPass>>) -> Self {
        Self {
            supersample_factor: 1,
            passes,
        }
    }

    pub fn supersample_factor(&self) -> u32 {
        self.supersample_factor
    }

    /// Names of the configured passes, in execution order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over `buffer`.
    pub fn run(&self, buffer: PixelBuffer) -> PixelBuffer {
        let mut current = if self.supersample_factor > 1 {
            let started = Instant::now();
            let resolved = supersample::resolve(&buffer, self.supersample_factor);
            log::debug!(
                "supersample resolve x{} took {:?}",
                self.supersample_factor,
                started.elapsed()
            );
            resolved
        } else {
            buffer
        };

        for pass in &self.passes {
            let started = Instant::now();
            current = pass.apply(&current);
            log::debug!("{} pass took {:?}", pass.name(), started.elapsed());
        }
        current
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("supersample_factor", &self.supersample_factor)
            .field("passes", &self.pass_names())
            .finish()
    }
}

/// Round and clamp an intermediate channel value.
#[inline]
pub(crate) fn clamp_channel(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Write `f(x, y, pixel)` for every foreground pixel into a new buffer,
/// copying background pixels through.
pub(crate) fn map_foreground<F>(src: &PixelBuffer, mut f: F) -> PixelBuffer
where
    F: FnMut(u32, u32, [u8; 4]) -> [u8; 4],
{
    let (width, height) = src.dimensions();
    let mut dst = PixelBuffer::new(width, height);
    for (x, y, px) in src.pixels() {
        let out = if is_background(px) { px } else { f(x, y, px) };
        dst.set_pixel(x, y, out);
    }
    dst
}

/// Neighbour at `(x, y)`; background and out-of-range pixels are replaced by
/// `center` so they do not bleed into the stroke.
#[inline]
pub(crate) fn neighbor_or(src: &PixelBuffer, x: i64, y: i64, center: [u8; 4]) -> [u8; 4] {
    match src.pixel_checked(x, y) {
        Some(px) if !is_background(px) => px,
        _ => center,
    }
}

/// Min, max and mean luminance over the 3x3 window around `(x, y)`,
/// counting only in-bounds foreground pixels.
pub(crate) fn local_luma_stats(src: &PixelBuffer, lum: &[f32], x: u32, y: u32) -> (f32, f32, f32) {
    let width = src.width() as i64;
    let (mut min, mut max, mut sum, mut count) = (f32::MAX, f32::MIN, 0.0f32, 0u32);
    for dy in -1..=1i64 {
        for dx in -1..=1i64 {
            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
            match src.pixel_checked(nx, ny) {
                Some(px) if !is_background(px) => {
                    let l = lum[(ny * width + nx) as usize];
                    min = min.min(l);
                    max = max.max(l);
                    sum += l;
                    count += 1;
                }
                _ => {}
            }
        }
    }
    if count == 0 {
        let l = lum[(y as i64 * width + x as i64) as usize];
        return (l, l, l);
    }
    (min, max, sum / count as f32)
}

/// Luminance with coordinates clamped to the buffer edge.
#[inline]
pub(crate) fn luma_clamped(lum: &[f32], width: u32, height: u32, x: i64, y: i64) -> f32 {
    let cx = x.clamp(0, width as i64 - 1) as usize;
    let cy = y.clamp(0, height as i64 - 1) as usize;
    lum[cy * width as usize + cx]
}

/// Sobel gradient `(gx, gy)` of the luminance map at `(x, y)`.
pub(crate) fn sobel(lum: &[f32], width: u32, height: u32, x: u32, y: u32) -> (f32, f32) {
    const GX: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
    const GY: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
    let (mut gx, mut gy) = (0.0, 0.0);
    for (j, dy) in (-1..=1i64).enumerate() {
        for (i, dx) in (-1..=1i64).enumerate() {
            let l = luma_clamped(lum, width, height, x as i64 + dx, y as i64 + dy);
            gx += GX[j][i] * l;
            gy += GY[j][i] * l;
        }
    }
    (gx, gy)
}

/// Bilinear sample of all four channels at a fractional position, clamped
/// to the buffer edge.
pub(crate) fn sample_bilinear(src: &PixelBuffer, fx: f32, fy: f32) -> [f32; 4] {
    let max_x = (src.width() - 1) as f32;
    let max_y = (src.height() - 1) as f32;
    let fx = fx.clamp(0.0, max_x);
    let fy = fy.clamp(0.0, max_y);
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = src.pixel_clamped(x0, y0);
    let p10 = src.pixel_clamped(x0 + 1, y0);
    let p01 = src.pixel_clamped(x0, y0 + 1);
    let p11 = src.pixel_clamped(x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = top * (1.0 - ty) + bottom * ty;
    }
    out
}

/// 3x3 convolution kernel, row-major, `weights[dy + 1][dx + 1]`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Kernel3 {
    weights: [[f32; 3]; 3],
}

impl Kernel3 {
    pub(crate) const fn new(weights: [[f32; 3]; 3]) -> Self {
        Self { weights }
    }

    /// Convolve the RGB channels around `(x, y)`. Background and
    /// out-of-range neighbours take the value of `center`.
    pub(crate) fn convolve_rgb(&self, src: &PixelBuffer, x: u32, y: u32, center: [u8; 4]) -> [f32; 3] {
        let mut acc = [0.0f32; 3];
        for (j, dy) in (-1..=1i64).enumerate() {
            for (i, dx) in (-1..=1i64).enumerate() {
                let w = self.weights[j][i];
                if w == 0.0 {
                    continue;
                }
                let px = neighbor_or(src, x as i64 + dx, y as i64 + dy, center);
                for c in 0..3 {
                    acc[c] += w * px[c] as f32;
                }
            }
        }
        acc
    }
}

/// Normalized-by-caller 3x3 Gaussian weights, row-major
pub(crate) const GAUSSIAN_3X3: [f32; 9] = [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0];
