//! Final encoding of a pixel buffer into image bytes

use crate::rendering::PixelBuffer;
use crate::{Error, Result};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    /// JPEG with quality 1-100; flattened onto [`JPEG_BACKGROUND`]
    Jpeg(u8),
    /// Lossless WebP
    WebP,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg(_) => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg(_) => "jpg",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Backdrop that formats without alpha are composited onto
pub const JPEG_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Composite every pixel over an opaque `background`, returning packed RGB.
pub fn flatten_onto(buffer: &PixelBuffer, background: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(buffer.data().len() / 4 * 3);
    for px in buffer.data().chunks_exact(4) {
        let alpha = px[3] as u32;
        for (channel, bg) in px[..3].iter().zip(background) {
            let mixed = (*channel as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255;
            rgb.push(mixed as u8);
        }
    }
    rgb
}

/// Encode `buffer` in the requested format.
pub fn encode(buffer: &PixelBuffer, format: OutputFormat) -> Result<Vec<u8>> {
    let (width, height) = buffer.dimensions();
    let img = buffer.to_rgba_image().ok_or_else(|| {
        Error::EncodeError(format!("buffer does not form a {}x{} RGBA image", width, height))
    })?;

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    match format {
        OutputFormat::Png => {
            img.write_to(&mut cursor, ImageFormat::Png)?;
        }
        OutputFormat::Jpeg(quality) => {
            let rgb = flatten_onto(buffer, JPEG_BACKGROUND);
            let rgb_img = RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| Error::EncodeError("failed to build RGB image".into()))?;
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
            rgb_img.write_with_encoder(encoder)?;
        }
        OutputFormat::WebP => {
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut cursor);
            img.write_with_encoder(encoder)?;
        }
    }

    log::debug!(
        "encoded {}x{} as {} ({} bytes)",
        width,
        height,
        format.mime_type(),
        bytes.len()
    );
    Ok(bytes)
}

/// Encoded image packaged for an attachment-sending collaborator, which only
/// needs the bytes, a file name and a MIME label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Name the attachment after the current time, e.g.
    /// `equation-1700000000000.png`.
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self::with_name(format!("equation-{}", millis), bytes, format)
    }

    /// Use `stem` plus the format's extension as the file name.
    pub fn with_name(stem: impl Into<String>, bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            file_name: format!("{}.{}", stem.into(), format.extension()),
            mime_type: format.mime_type(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_has_signature_and_round_trips() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.set_pixel(1, 1, [200, 100, 50, 128]);
        let bytes = encode(&buf, OutputFormat::Png).unwrap();
        assert_eq!(&bytes[0..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [200, 100, 50, 128]);
    }

    #[test]
    fn jpeg_and_webp_encode() {
        let buf = PixelBuffer::filled(8, 8, [255, 255, 255, 255]);
        let jpeg = encode(&buf, OutputFormat::Jpeg(95)).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        let webp = encode(&buf, OutputFormat::WebP).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
    }

    #[test]
    fn flatten_blends_by_alpha() {
        let mut buf = PixelBuffer::new(3, 1);
        buf.set_pixel(1, 0, [0, 0, 0, 255]);
        buf.set_pixel(2, 0, [0, 0, 0, 128]);
        assert_eq!(
            flatten_onto(&buf, [255, 255, 255]),
            vec![255, 255, 255, 0, 0, 0, 127, 127, 127]
        );
    }

    #[test]
    fn jpeg_draws_dark_strokes_on_a_light_backdrop() {
        let mut buf = PixelBuffer::new(16, 16);
        for y in 0..16 {
            for x in 6..10 {
                buf.set_pixel(x, y, [0, 0, 0, 255]);
            }
        }
        let jpeg = encode(&buf, OutputFormat::Jpeg(95)).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        assert!(decoded.get_pixel(1, 8).0.iter().all(|&c| c > 230));
        assert!(decoded.get_pixel(8, 8).0.iter().all(|&c| c < 40));
    }

    #[test]
    fn attachment_names_follow_format() {
        let a = Attachment::with_name("eq", vec![1, 2, 3], OutputFormat::Png);
        assert_eq!(a.file_name, "eq.png");
        assert_eq!(a.mime_type, "image/png");

        let b = Attachment::new(vec![], OutputFormat::WebP);
        assert!(b.file_name.starts_with("equation-"));
        assert!(b.file_name.ends_with(".webp"));
    }
}
