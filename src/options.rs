//! Filter selection and tuning for the post-processing pipeline

use serde::{Deserialize, Serialize};

/// Morphological operator used by the edge enhancement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Adds `gray - opening`: brightens thin bright details
    #[default]
    TopHat,
    /// Adds `closing - gray`: emphasises thin dark gaps
    BlackHat,
    /// Adds half of the local morphological gradient
    Gradient,
    /// Rescales channels by the local minimum
    Erosion,
    /// Rescales channels by the local maximum
    Dilation,
}

/// Post-processing configuration.
///
/// Every field has its own default, so a partially specified JSON object
/// deserializes into a complete record:
///
/// ```
/// let opts: eqraster::FilterOptions =
///     serde_json::from_str(r#"{ "bilateralFilter": true, "edgeType": "gradient" }"#).unwrap();
/// assert!(opts.bilateral_filter);
/// assert_eq!(opts.edge_type, eqraster::EdgeType::Gradient);
/// assert_eq!(opts.supersample_factor, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterOptions {
    /// Run the morphological edge enhancement pass
    pub edge_enhance: bool,
    /// Operator for the edge enhancement pass
    pub edge_type: EdgeType,
    /// Window radius for morphology, window side is `2 * radius + 1`
    pub edge_radius: u32,
    /// Run math-stroke enhancement
    pub math_stroke: bool,
    /// Weight applied to the stroke strength estimate
    pub stroke_intensity: f32,
    /// Run the 5x5 bilateral filter
    pub bilateral_filter: bool,
    /// Snap partially faded one-pixel vertical stems to opaque
    pub glyph_alignment_correction: bool,
    /// Minimum normalized alpha (0-1) for a stem pixel to be snapped
    pub glyph_threshold: f32,
    /// Simulate RGB-striped subpixel hinting
    pub subpixel_hinting: bool,
    /// Run adaptive contrast enhancement
    pub adaptive_contrast: bool,
    /// Strength of adaptive contrast (0.5-2.0)
    pub contrast_amount: f32,
    /// Sharpen line-like symbol parts along their dominant direction
    pub symbol_recognition: bool,
    /// Use vector-field anti-aliasing instead of edge-preserving AA
    #[serde(rename = "vectorFieldAA")]
    pub vector_field_aa: bool,
    /// Blend weight for vector-field AA (0-1)
    pub vfaa_intensity: f32,
    /// Rasterize at this multiple of the target size, then resolve down
    pub supersample_factor: u32,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            edge_enhance: false,
            edge_type: EdgeType::TopHat,
            edge_radius: 1,
            math_stroke: false,
            stroke_intensity: 1.0,
            bilateral_filter: false,
            glyph_alignment_correction: false,
            glyph_threshold: 0.3,
            subpixel_hinting: false,
            adaptive_contrast: false,
            contrast_amount: 1.0,
            symbol_recognition: false,
            vector_field_aa: false,
            vfaa_intensity: 0.5,
            supersample_factor: 1,
        }
    }
}

/// Upper bound for `supersample_factor`; larger factors only cost memory.
pub const MAX_SUPERSAMPLE_FACTOR: u32 = 8;

/// Upper bound for `edge_radius`. Morphology cost grows with the square of
/// the radius, and glyph strokes are only a few pixels wide.
pub const MAX_EDGE_RADIUS: u32 = 16;

impl FilterOptions {
    /// Clamp every numeric field into its documented domain.
    ///
    /// Out-of-range values are accepted and pulled to the nearest bound with a
    /// warning; non-finite floats fall back to the field default.
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let mut out = self.clone();

        out.edge_radius = clamp_u32("edgeRadius", self.edge_radius, 1, MAX_EDGE_RADIUS);
        out.supersample_factor = clamp_u32(
            "supersampleFactor",
            self.supersample_factor,
            1,
            MAX_SUPERSAMPLE_FACTOR,
        );
        out.stroke_intensity = clamp_f32(
            "strokeIntensity",
            self.stroke_intensity,
            0.0,
            f32::MAX,
            defaults.stroke_intensity,
        );
        out.glyph_threshold = clamp_f32(
            "glyphThreshold",
            self.glyph_threshold,
            0.0,
            1.0,
            defaults.glyph_threshold,
        );
        out.contrast_amount = clamp_f32(
            "contrastAmount",
            self.contrast_amount,
            0.5,
            2.0,
            defaults.contrast_amount,
        );
        out.vfaa_intensity = clamp_f32(
            "vfaaIntensity",
            self.vfaa_intensity,
            0.0,
            1.0,
            defaults.vfaa_intensity,
        );
        out
    }
}

fn clamp_u32(name: &str, value: u32, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("filter option {} = {} out of range, using {}", name, value, clamped);
    }
    clamped
}

fn clamp_f32(name: &str, value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("filter option {} is not finite, using {}", name, fallback);
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("filter option {} = {} out of range, using {}", name, value, clamped);
    }
    clamped
}
