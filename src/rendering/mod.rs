//! Rendering: pixel buffers, rasterization and encoding

pub mod encode;
pub mod raster;

use sha2::{Digest, Sha256};

/// Pixels with alpha below this value are treated as background.
pub const BACKGROUND_ALPHA: u8 = 10;

const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Perceptual luminance shared by every filter.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    luminance_rgb([r as f32, g as f32, b as f32])
}

/// Luminance of an intermediate (unclamped) RGB triple.
#[inline]
pub fn luminance_rgb(rgb: [f32; 3]) -> f32 {
    LUMA_R * rgb[0] + LUMA_G * rgb[1] + LUMA_B * rgb[2]
}

/// Luminance of an RGBA pixel, alpha ignored.
#[inline]
pub fn pixel_luminance(px: [u8; 4]) -> f32 {
    luminance(px[0], px[1], px[2])
}

/// Whether a pixel is (near) fully transparent background.
#[inline]
pub fn is_background(px: [u8; 4]) -> bool {
    px[3] < BACKGROUND_ALPHA
}

/// An RGBA raster owned by a single render.
///
/// `data` is straight (non-premultiplied) RGBA, row-major, four bytes per
/// pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// A buffer filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Wrap raw RGBA bytes; `None` when the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Pixel at `(x, y)`; panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Pixel at `(x, y)` with coordinates clamped to the buffer edge.
    #[inline]
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 4] {
        let cx = x.clamp(0, self.width as i64 - 1) as u32;
        let cy = y.clamp(0, self.height as i64 - 1) as u32;
        self.pixel(cx, cy)
    }

    /// Pixel at `(x, y)`, `None` outside the buffer.
    #[inline]
    pub fn pixel_checked(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.pixel(x as u32, y as u32))
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Iterate `(x, y, pixel)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, [u8; 4])> + '_ {
        let width = self.width;
        self.data.chunks_exact(4).enumerate().map(move |(i, px)| {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            (x, y, [px[0], px[1], px[2], px[3]])
        })
    }

    /// Per-pixel luminance, row-major.
    pub fn luminance_map(&self) -> Vec<f32> {
        self.data
            .chunks_exact(4)
            .map(|px| luminance(px[0], px[1], px[2]))
            .collect()
    }

    /// SHA-256 over dimensions and pixel bytes, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }

    /// Whether every pixel is background.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] < BACKGROUND_ALPHA)
    }

    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}
