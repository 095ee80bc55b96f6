//! eqraster
//!
//! Turns markup produced by a math typesetting engine (KaTeX/MathJax output)
//! into raster image bytes suitable for posting as a chat attachment.
//!
//! # Pipeline
//!
//! - **Sanitize**: strip anything executable from the markup
//! - **Compose**: wrap it in a self-contained SVG document of a given size
//! - **Rasterize**: decode and draw it, bounded by a timeout
//! - **Post-process**: an ordered set of filter passes tuned for math glyphs
//! - **Encode**: PNG by default
//!
//! # Example
//!
//! ```no_run
//! use eqraster::{FilterOptions, RenderConfig, Renderer};
//!
//! # async fn run() -> eqraster::Result<()> {
//! let renderer = Renderer::new(RenderConfig {
//!     quality_multiplier: 2,
//!     ..Default::default()
//! });
//! let options = FilterOptions {
//!     glyph_alignment_correction: true,
//!     ..Default::default()
//! };
//! let png = renderer
//!     .render(r#"<svg viewBox="0 0 20 10"><path d="M1 5h18"/></svg>"#, 200, 100, &options)
//!     .await?;
//! assert_eq!(&png[1..4], b"PNG");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod compose;
pub mod error;
pub mod filters;
pub mod options;
pub mod rendering;
pub mod sanitize;

pub use compose::{compose, VectorDocument};
pub use error::{Error, Result};
pub use filters::{FilterPass, Pipeline};
pub use options::{EdgeType, FilterOptions, MAX_EDGE_RADIUS, MAX_SUPERSAMPLE_FACTOR};
pub use rendering::encode::{encode, Attachment, OutputFormat};
pub use rendering::raster::{DecodedDocument, DocumentDecoder, Rasterizer, ResvgDecoder};
pub use rendering::{luminance, PixelBuffer};
pub use sanitize::sanitize;

/// Stylesheet applied to every composed document: enlarges KaTeX output and
/// asks for geometric precision when drawing shapes and text.
pub const DEFAULT_STYLESHEET: &str = ".katex { font-size: 2.5em !important; }\n\
.katex * { shape-rendering: geometricPrecision; text-rendering: geometricPrecision; }\n";

/// Upper bound for `quality_multiplier`
pub const MAX_QUALITY_MULTIPLIER: u32 = 8;

/// Configuration for a [`Renderer`]
///
/// The defaults match what a chat integration needs: a five second decode
/// budget, no extra resolution and PNG output.
///
/// # Examples
///
/// ```
/// let cfg = eqraster::RenderConfig::default();
/// assert_eq!(cfg.timeout_ms, 5000);
/// assert_eq!(cfg.output_format, eqraster::OutputFormat::Png);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Decode timeout in milliseconds
    pub timeout_ms: u64,
    /// Render at this multiple of the requested size (1-8)
    pub quality_multiplier: u32,
    /// Stylesheet inlined into every composed document
    pub stylesheet: String,
    /// Encoding of the final image
    pub output_format: OutputFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: rendering::raster::DEFAULT_DECODE_TIMEOUT_MS,
            quality_multiplier: 1,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            output_format: OutputFormat::Png,
        }
    }
}

/// Runs the whole markup-to-image pipeline.
///
/// A renderer holds no per-render state; concurrent renders on the same
/// instance are independent.
#[derive(Clone)]
pub struct Renderer {
    config: RenderConfig,
    rasterizer: Rasterizer,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_decoder(config, Arc::new(ResvgDecoder::new()))
    }

    /// Use a custom decoder, e.g. one with system fonts loaded.
    pub fn with_decoder(config: RenderConfig, decoder: Arc<dyn DocumentDecoder>) -> Self {
        let quality = config.quality_multiplier.clamp(1, MAX_QUALITY_MULTIPLIER);
        if quality != config.quality_multiplier {
            log::warn!(
                "quality multiplier {} out of range, using {}",
                config.quality_multiplier,
                quality
            );
        }
        let config = RenderConfig {
            quality_multiplier: quality,
            ..config
        };
        let rasterizer = Rasterizer::new(decoder, Duration::from_millis(config.timeout_ms));
        Self { config, rasterizer }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `markup` at `width` x `height` CSS pixels and encode it.
    ///
    /// The output image is `width * quality_multiplier` by
    /// `height * quality_multiplier` pixels.
    pub async fn render(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        options: &FilterOptions,
    ) -> Result<Vec<u8>> {
        let buffer = self.render_pixels(markup, width, height, options).await?;
        let started = Instant::now();
        let bytes = encode(&buffer, self.config.output_format)?;
        log::debug!("encode took {:?}", started.elapsed());
        Ok(bytes)
    }

    /// Like [`render`](Self::render) but stops before encoding.
    pub async fn render_pixels(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        options: &FilterOptions,
    ) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height));
        }

        let pipeline = Pipeline::from_options(options);
        let quality = self.config.quality_multiplier;
        let (out_w, out_h) = scaled(width, height, quality)?;
        let (raster_w, raster_h) = scaled(out_w, out_h, pipeline.supersample_factor())?;

        let started = Instant::now();
        let clean = sanitize(markup);
        log::debug!("sanitize took {:?}", started.elapsed());

        let document = compose(&clean, width, height, &self.config.stylesheet)?;
        let raw = self.rasterizer.rasterize(&document, raster_w, raster_h).await?;

        let started = Instant::now();
        let processed = pipeline.run(raw);
        log::debug!(
            "post-processing {:?} took {:?}",
            pipeline.pass_names(),
            started.elapsed()
        );
        Ok(processed)
    }

    /// Render and package the image for an attachment-sending collaborator.
    pub async fn render_attachment(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        options: &FilterOptions,
    ) -> Result<Attachment> {
        let bytes = self.render(markup, width, height, options).await?;
        Ok(Attachment::new(bytes, self.config.output_format))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// Multiply both dimensions, treating overflow as invalid dimensions.
fn scaled(width: u32, height: u32, factor: u32) -> Result<(u32, u32)> {
    match (width.checked_mul(factor), height.checked_mul(factor)) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(Error::invalid_dimensions(
            width as u64 * factor as u64,
            height as u64 * factor as u64,
        )),
    }
}

/// Render with [`RenderConfig::default`].
pub async fn render(markup: &str, width: u32, height: u32, options: &FilterOptions) -> Result<Vec<u8>> {
    Renderer::default().render(markup, width, height, options).await
}
