//! Morphological edge enhancement on the luminance channel

use super::{clamp_channel, map_foreground, FilterPass};
use crate::options::{EdgeType, MAX_EDGE_RADIUS};
use crate::rendering::{is_background, PixelBuffer};

/// Gray-scale morphology over a square window of side `2 * radius + 1`.
///
/// Operators act on luminance; the result is folded back into RGB either
/// additively (top-hat, black-hat, gradient) or as a ratio (erosion,
/// dilation). Alpha is never modified.
#[derive(Debug, Clone, Copy)]
pub struct MorphologicalEdge {
    edge_type: EdgeType,
    radius: u32,
}

impl MorphologicalEdge {
    pub fn new(edge_type: EdgeType, radius: u32) -> Self {
        Self {
            edge_type,
            radius: radius.clamp(1, MAX_EDGE_RADIUS),
        }
    }
}

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

/// Windowed min or max of `gray`, ignoring background pixels. A pixel whose
/// window holds no foreground keeps its own value.
fn window_extremum(gray: &[f32], mask: &[bool], width: u32, height: u32, radius: u32, op: Extremum) -> Vec<f32> {
    let (w, h, r) = (width as i64, height as i64, radius as i64);
    let mut out = Vec::with_capacity(gray.len());
    for y in 0..h {
        for x in 0..w {
            let mut acc: Option<f32> = None;
            for ny in (y - r).max(0)..=(y + r).min(h - 1) {
                for nx in (x - r).max(0)..=(x + r).min(w - 1) {
                    let i = (ny * w + nx) as usize;
                    if mask[i] {
                        continue;
                    }
                    let v = gray[i];
                    acc = Some(match (acc, op) {
                        (None, _) => v,
                        (Some(a), Extremum::Min) => a.min(v),
                        (Some(a), Extremum::Max) => a.max(v),
                    });
                }
            }
            out.push(acc.unwrap_or(gray[(y * w + x) as usize]));
        }
    }
    out
}

impl FilterPass for MorphologicalEdge {
    fn name(&self) -> &'static str {
        "morphological-edge"
    }

    fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        let (width, height) = src.dimensions();
        let gray = src.luminance_map();
        let background: Vec<bool> = src.pixels().map(|(_, _, px)| is_background(px)).collect();
        let extremum = |values: &[f32], op| window_extremum(values, &background, width, height, self.radius, op);

        // Either an additive adjustment or a multiplicative ratio per pixel
        enum Fold {
            Add(Vec<f32>),
            Ratio(Vec<f32>),
        }

        let fold = match self.edge_type {
            EdgeType::TopHat => {
                let opening = extremum(&extremum(&gray, Extremum::Min), Extremum::Max);
                Fold::Add(gray.iter().zip(&opening).map(|(g, o)| g - o).collect())
            }
            EdgeType::BlackHat => {
                let closing = extremum(&extremum(&gray, Extremum::Max), Extremum::Min);
                Fold::Add(closing.iter().zip(&gray).map(|(c, g)| c - g).collect())
            }
            EdgeType::Gradient => {
                let dilated = extremum(&gray, Extremum::Max);
                let eroded = extremum(&gray, Extremum::Min);
                Fold::Add(dilated.iter().zip(&eroded).map(|(d, e)| 0.5 * (d - e)).collect())
            }
            EdgeType::Erosion => {
                let eroded = extremum(&gray, Extremum::Min);
                Fold::Ratio(eroded.iter().zip(&gray).map(|(e, g)| e / g.max(1.0)).collect())
            }
            EdgeType::Dilation => {
                let dilated = extremum(&gray, Extremum::Max);
                Fold::Ratio(dilated.iter().zip(&gray).map(|(d, g)| d / g.max(1.0)).collect())
            }
        };

        map_foreground(src, |x, y, px| {
            let i = (y * width + x) as usize;
            let channel = |c: usize| match &fold {
                Fold::Add(adj) => clamp_channel(px[c] as f32 + adj[i]),
                Fold::Ratio(ratio) => clamp_channel(px[c] as f32 * ratio[i]),
            };
            [channel(0), channel(1), channel(2), px[3]]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot() -> PixelBuffer {
        let mut src = PixelBuffer::filled(5, 5, [50, 50, 50, 255]);
        src.set_pixel(2, 2, [150, 150, 150, 255]);
        src
    }

    #[test]
    fn radius_is_capped() {
        assert_eq!(MorphologicalEdge::new(EdgeType::TopHat, 0).radius, 1);
        let huge = MorphologicalEdge::new(EdgeType::TopHat, u32::MAX);
        assert_eq!(huge.radius, MAX_EDGE_RADIUS);
        let capped = MorphologicalEdge::new(EdgeType::TopHat, MAX_EDGE_RADIUS);
        assert_eq!(huge.apply(&dot()), capped.apply(&dot()));
    }

    #[test]
    fn top_hat_boosts_small_bright_detail() {
        let out = MorphologicalEdge::new(EdgeType::TopHat, 1).apply(&dot());
        // opening removes the dot, so it gains (150 - 50)
        assert_eq!(out.pixel(2, 2), [250, 250, 250, 255]);
        assert_eq!(out.pixel(0, 0), [50, 50, 50, 255]);
    }

    #[test]
    fn black_hat_boosts_small_dark_gap() {
        let mut src = PixelBuffer::filled(5, 5, [150, 150, 150, 255]);
        src.set_pixel(2, 2, [50, 50, 50, 255]);
        let out = MorphologicalEdge::new(EdgeType::BlackHat, 1).apply(&src);
        assert_eq!(out.pixel(2, 2), [150, 150, 150, 255]);
    }

    #[test]
    fn gradient_adds_half_local_range() {
        let out = MorphologicalEdge::new(EdgeType::Gradient, 1).apply(&dot());
        assert_eq!(out.pixel(1, 1), [100, 100, 100, 255]);
        assert_eq!(out.pixel(4, 4), [50, 50, 50, 255]);
    }

    #[test]
    fn erosion_and_dilation_rescale_by_ratio() {
        let eroded = MorphologicalEdge::new(EdgeType::Erosion, 1).apply(&dot());
        assert_eq!(eroded.pixel(2, 2), [50, 50, 50, 255]);
        let dilated = MorphologicalEdge::new(EdgeType::Dilation, 1).apply(&dot());
        assert_eq!(dilated.pixel(1, 1), [150, 150, 150, 255]);
    }

    #[test]
    fn alpha_is_preserved_and_background_ignored() {
        let mut src = dot();
        src.set_pixel(2, 1, [255, 255, 255, 0]);
        src.set_pixel(3, 3, [150, 150, 150, 90]);
        let out = MorphologicalEdge::new(EdgeType::Dilation, 2).apply(&src);
        assert_eq!(out.pixel(2, 1), [255, 255, 255, 0]);
        assert_eq!(out.pixel(3, 3)[3], 90);
        assert_eq!(out.pixel(0, 0), [150, 150, 150, 255]);
    }
}
