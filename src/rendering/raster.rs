//! Rasterizer: vector document -> PixelBuffer
//!
//! Decoding is the only suspension point of the pipeline. It is bounded by a
//! timeout and either yields a complete buffer or an error, never a partial
//! buffer.

use crate::compose::VectorDocument;
use crate::rendering::PixelBuffer;
use crate::{Error, Result};
use base64::Engine as _;
use futures::future::BoxFuture;
use resvg::{tiny_skia, usvg};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default decode timeout in milliseconds
pub const DEFAULT_DECODE_TIMEOUT_MS: u64 = 5000;

/// A parsed vector document, ready to be drawn at any size.
pub struct DecodedDocument {
    tree: usvg::Tree,
}

impl DecodedDocument {
    /// Parse SVG source. External references (files, URLs) are never
    /// resolved; embedded `data:` images still are.
    pub fn parse(svg: &str, fontdb: Arc<usvg::fontdb::Database>) -> Result<Self> {
        let mut options = usvg::Options::default();
        options.fontdb = fontdb;
        options.shape_rendering = usvg::ShapeRendering::GeometricPrecision;
        options.text_rendering = usvg::TextRendering::GeometricPrecision;
        options.image_rendering = usvg::ImageRendering::OptimizeQuality;
        options.image_href_resolver = usvg::ImageHrefResolver {
            resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
            resolve_string: Box::new(refuse_external_href),
        };

        let tree = usvg::Tree::from_str(svg, &options)
            .map_err(|e| Error::DecodeError(format!("Failed to parse SVG: {}", e)))?;
        Ok(Self { tree })
    }

    /// Intrinsic size in CSS pixels
    pub fn size(&self) -> (f32, f32) {
        let size = self.tree.size();
        (size.width(), size.height())
    }
}

fn refuse_external_href(href: &str, _: &usvg::Options<'_>) -> Option<usvg::ImageKind> {
    log::warn!("ignoring external image reference {}", href);
    None
}

/// Turns a data URI into a decoded document.
///
/// Implementations may take arbitrarily long; [`Rasterizer`] bounds them with
/// its timeout.
pub trait DocumentDecoder: Send + Sync {
    fn decode(&self, data_uri: &str) -> BoxFuture<'static, Result<DecodedDocument>>;
}

/// Default decoder backed by `resvg`/`usvg`, parsing on a blocking task.
#[derive(Clone)]
pub struct ResvgDecoder {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgDecoder {
    /// A decoder with an empty font database (engine output is expected to
    /// carry glyphs as paths).
    pub fn new() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    /// A decoder that can resolve text against locally installed fonts.
    pub fn with_system_fonts() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} system font faces", db.len());
        Self { fontdb: Arc::new(db) }
    }
}

impl Default for ResvgDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentDecoder for ResvgDecoder {
    fn decode(&self, data_uri: &str) -> BoxFuture<'static, Result<DecodedDocument>> {
        let data_uri = data_uri.to_string();
        let fontdb = Arc::clone(&self.fontdb);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let svg = decode_data_uri(&data_uri)?;
                DecodedDocument::parse(&svg, fontdb)
            })
            .await
            .map_err(|e| Error::DecodeError(format!("Decode task failed: {}", e)))?
        })
    }
}

/// Extract the SVG source from an `image/svg+xml` data URI, either
/// percent-encoded or `;base64`.
pub fn decode_data_uri(uri: &str) -> Result<String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::DecodeError("not a data URI".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DecodeError("data URI has no payload".into()))?;

    let meta = meta.to_ascii_lowercase();
    if !meta.starts_with("image/svg+xml") {
        return Err(Error::DecodeError(format!("unsupported media type '{}'", meta)));
    }

    let bytes = if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::DecodeError(format!("invalid base64 payload: {}", e)))?
    } else {
        percent_decode(payload)
    };

    String::from_utf8(bytes).map_err(|e| Error::DecodeError(format!("payload is not UTF-8: {}", e)))
}

fn percent_decode(s: &str) -> Vec<u8> {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Draw a decoded document onto a fresh, cleared surface of the given size.
pub fn draw(document: &DecodedDocument, width: u32, height: u32) -> Result<PixelBuffer> {
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        Error::ContextUnavailableError(format!("cannot allocate a {}x{} surface", width, height))
    })?;
    pixmap.fill(tiny_skia::Color::TRANSPARENT);

    let (src_w, src_h) = document.size();
    let transform = tiny_skia::Transform::from_scale(width as f32 / src_w, height as f32 / src_h);
    resvg::render(&document.tree, transform, &mut pixmap.as_mut());

    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    PixelBuffer::from_raw(width, height, data)
        .ok_or_else(|| Error::ContextUnavailableError("surface size mismatch".into()))
}

/// Decodes composed documents and draws them into pixel buffers.
#[derive(Clone)]
pub struct Rasterizer {
    decoder: Arc<dyn DocumentDecoder>,
    timeout: Duration,
}

impl Rasterizer {
    pub fn new(decoder: Arc<dyn DocumentDecoder>, timeout: Duration) -> Self {
        Self { decoder, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Rasterize `document` into a `width` x `height` buffer.
    ///
    /// A document that embeds HTML and draws nothing at all is reported as a
    /// [`Error::DecodeError`] rather than an empty image.
    pub async fn rasterize(
        &self,
        document: &VectorDocument,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height));
        }

        let started = Instant::now();
        let decode = self.decoder.decode(&document.data_uri());
        let decoded = match tokio::time::timeout(self.timeout, decode).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::RasterizationTimeoutError(self.timeout.as_millis() as u64));
            }
        };
        log::debug!("decoded vector document in {:?}", started.elapsed());

        let buffer = draw(&decoded, width, height)?;
        if document.embeds_html() && buffer.is_blank() {
            log::warn!("HTML markup produced no drawable content");
            return Err(Error::DecodeError(
                "markup embedded as foreignObject drew nothing; supply SVG engine output".into(),
            ));
        }
        log::debug!(
            "rasterized {}x{} in {:?}",
            width,
            height,
            started.elapsed()
        );
        Ok(buffer)
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(
            Arc::new(ResvgDecoder::new()),
            Duration::from_millis(DEFAULT_DECODE_TIMEOUT_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;

    #[test]
    fn percent_decoding_round_trips_escapes() {
        assert_eq!(percent_decode("a%23b%27c%25d"), b"a#b'c%d".to_vec());
        assert_eq!(percent_decode("100%"), b"100%".to_vec());
        assert_eq!(percent_decode("%zz"), b"%zz".to_vec());
    }

    #[test]
    fn decode_data_uri_accepts_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(SQUARE);
        let uri = format!("data:image/svg+xml;base64,{}", encoded);
        assert_eq!(decode_data_uri(&uri).unwrap(), SQUARE);
    }

    #[test]
    fn decode_data_uri_rejects_other_media() {
        assert!(matches!(
            decode_data_uri("data:text/html,<p>x</p>"),
            Err(Error::DecodeError(_))
        ));
        assert!(matches!(decode_data_uri("not a uri"), Err(Error::DecodeError(_))));
    }

    #[test]
    fn draw_scales_to_target_and_unpremultiplies() {
        let fontdb = Arc::new(usvg::fontdb::Database::new());
        let doc = DecodedDocument::parse(SQUARE, fontdb).unwrap();
        assert_eq!(doc.size(), (10.0, 10.0));
        let buf = draw(&doc, 20, 20).unwrap();
        assert_eq!(buf.dimensions(), (20, 20));
        assert_eq!(buf.pixel(10, 10), [255, 0, 0, 255]);
    }

    #[test]
    fn malformed_svg_is_a_decode_error() {
        let fontdb = Arc::new(usvg::fontdb::Database::new());
        assert!(matches!(
            DecodedDocument::parse("<svg", fontdb),
            Err(Error::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn rasterizes_composed_svg_markup() {
        let markup = r##"<svg width="10" height="10"><rect width="10" height="10" fill="#0000ff"/></svg>"##;
        let doc = compose(markup, 10, 10, "").unwrap();
        let buf = Rasterizer::default().rasterize(&doc, 10, 10).await.unwrap();
        assert_eq!(buf.pixel(5, 5), [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn html_that_draws_nothing_is_a_decode_error() {
        let doc = compose(r#"<span class="katex">x</span>"#, 16, 8, "").unwrap();
        let err = Rasterizer::default().rasterize(&doc, 16, 8).await.unwrap_err();
        assert!(matches!(err, Error::DecodeError(msg) if msg.contains("foreignObject")));
    }
}
