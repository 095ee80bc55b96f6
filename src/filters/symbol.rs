//! Direction-aware sharpening of line-like symbol parts
//!
//! Fraction bars, radical signs, integral strokes and arrows are mostly
//! straight segments. An edge map is scanned along four directions; where
//! one direction clearly dominates, the pixel is sharpened across the line.

use super::{clamp_channel, luma_clamped, map_foreground, FilterPass, Kernel3};
use crate::rendering::PixelBuffer;

const EDGE_MAGNITUDE_MIN: f32 = 50.0;
/// Minimum number of edge pixels on a 5-pixel run to count as a line
const LINE_SCORE_MIN: u32 = 3;
const RUN_REACH: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineDirection {
    Vertical,
    Horizontal,
    Diagonal,
    AntiDiagonal,
}

impl LineDirection {
    /// Tie-break order is the order of this list.
    const ALL: [LineDirection; 4] = [
        LineDirection::Vertical,
        LineDirection::Horizontal,
        LineDirection::Diagonal,
        LineDirection::AntiDiagonal,
    ];

    fn step(self) -> (i64, i64) {
        match self {
            LineDirection::Vertical => (0, 1),
            LineDirection::Horizontal => (1, 0),
            LineDirection::Diagonal => (1, 1),
            LineDirection::AntiDiagonal => (1, -1),
        }
    }

    /// Sharpening kernel with its negative taps across the line.
    fn kernel(self) -> Kernel3 {
        match self {
            LineDirection::Vertical => {
                Kernel3::new([[0.0, 0.0, 0.0], [-0.5, 2.0, -0.5], [0.0, 0.0, 0.0]])
            }
            LineDirection::Horizontal => {
                Kernel3::new([[0.0, -0.5, 0.0], [0.0, 2.0, 0.0], [0.0, -0.5, 0.0]])
            }
            LineDirection::Diagonal => {
                Kernel3::new([[0.0, 0.0, -0.5], [0.0, 2.0, 0.0], [-0.5, 0.0, 0.0]])
            }
            LineDirection::AntiDiagonal => {
                Kernel3::new([[-0.5, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, -0.5]])
            }
        }
    }
}

/// Line-structure sharpening.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolRecognition;

impl SymbolRecognition {
    fn edge_map(src: &PixelBuffer) -> Vec<bool> {
        let (width, height) = src.dimensions();
        let lum = src.luminance_map();
        let mut edges = Vec::with_capacity(lum.len());
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let (mut gx, mut gy) = (0.0f32, 0.0f32);
                for dy in -1..=1i64 {
                    for dx in -1..=1i64 {
                        let l = luma_clamped(&lum, width, height, x + dx, y + dy);
                        gx += l * dx as f32;
                        gy += l * dy as f32;
                    }
                }
                edges.push((gx * gx + gy * gy).sqrt() > EDGE_MAGNITUDE_MIN);
            }
        }
        edges
    }

    fn dominant_direction(edges: &[bool], width: u32, height: u32, x: u32, y: u32) -> Option<LineDirection> {
        let is_edge = |px: i64, py: i64| {
            px >= 0
                && py >= 0
                && px < width as i64
                && py < height as i64
                && edges[(py * width as i64 + px) as usize]
        };

        let mut best: Option<(LineDirection, u32)> = None;
        for dir in LineDirection::ALL {
            let (sx, sy) = dir.step();
            let score = (-RUN_REACH..=RUN_REACH)
                .filter(|k| is_edge(x as i64 + k * sx, y as i64 + k * sy))
                .count() as u32;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((dir, score));
            }
        }
        best.filter(|&(_, score)| score >= LINE_SCORE_MIN)
            .map(|(dir, _)| dir)
    }
}

impl FilterPass for SymbolRecognition {
    fn name(&self) -> &'static str {
        "symbol-recognition"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let (width, height) = src.dimensions();
        let edges = Self::edge_map(src);
        map_foreground(src, |x, y, px| {
            let Some(dir) = Self::dominant_direction(&edges, width, height, x, y) else {
                return px;
            };
            let rgb = dir.kernel().convolve_rgb(src, x, y, px);
            [
                clamp_channel(rgb[0]),
                clamp_channel(rgb[1]),
                clamp_channel(rgb[2]),
                px[3],
            ]
        })
    }
}
