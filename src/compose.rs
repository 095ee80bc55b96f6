//! Vector document composer
//!
//! Wraps sanitized markup into one self-contained SVG document with an
//! explicit pixel size. The document is decoded without network access, so it
//! must not reference anything external: `@font-face` rules are removed and
//! the engine stylesheet is inlined.

use crate::sanitize::neutralize_schemes;
use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Prefix of every data URI produced by [`VectorDocument::data_uri`]
pub const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;charset=utf-8,";

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// A composed, self-contained SVG document ready for rasterization
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    width: u32,
    height: u32,
    svg: String,
    embeds_html: bool,
}

impl VectorDocument {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the markup was wrapped in a `<foreignObject>` as XHTML.
    ///
    /// The bundled drawing backend does not paint foreign content, so such a
    /// document only shows up when the markup also carries vector elements.
    pub fn embeds_html(&self) -> bool {
        self.embeds_html
    }

    /// The raw SVG source
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// The document as a `data:` URI.
    ///
    /// `%`, `#` and `'` are percent-escaped and any executable URI scheme that
    /// survived sanitization is replaced, so the URI can be embedded as-is.
    pub fn data_uri(&self) -> String {
        let mut escaped = String::with_capacity(self.svg.len() + 64);
        for c in self.svg.chars() {
            match c {
                '%' => escaped.push_str("%25"),
                '#' => escaped.push_str("%23"),
                '\'' => escaped.push_str("%27"),
                _ => escaped.push(c),
            }
        }
        format!("{}{}", SVG_DATA_URI_PREFIX, neutralize_schemes(&escaped))
    }
}

fn font_face_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@font-face\s*\{[^}]*\}").expect("valid font-face regex"))
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("valid style block regex")
    })
}

/// Remove every `@font-face { ... }` rule from a stylesheet
pub fn strip_font_faces(css: &str) -> String {
    font_face_re().replace_all(css, "").into_owned()
}

/// Remove `@font-face` rules inside every `<style>` block of `markup`
fn strip_embedded_font_faces(markup: &str) -> String {
    style_block_re()
        .replace_all(markup, |caps: &regex::Captures<'_>| {
            format!("{}{}{}", &caps[1], strip_font_faces(&caps[2]), &caps[3])
        })
        .into_owned()
}

/// Compose sanitized markup into a vector document of `width` x `height`
/// pixels, inlining `stylesheet`.
pub fn compose(markup: &str, width: u32, height: u32, stylesheet: &str) -> Result<VectorDocument> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_dimensions(width, height));
    }

    let markup = strip_embedded_font_faces(markup);
    let css = strip_font_faces(stylesheet);

    let mut svg = String::with_capacity(markup.len() + css.len() + 256);
    svg.push_str(&format!(
        r#"<svg xmlns="{ns}" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        ns = SVG_NS,
        w = width,
        h = height
    ));
    svg.push_str("<style><![CDATA[body{margin:0;}");
    svg.push_str(&css.replace("]]>", "]]]]><![CDATA[>"));
    svg.push_str("]]></style>");

    let embeds_html = !markup.trim_start().starts_with("<svg");
    if !embeds_html {
        svg.push_str(r#"<g class="equation">"#);
        svg.push_str(&markup);
        svg.push_str("</g>");
    } else {
        svg.push_str(r#"<foreignObject x="0" y="0" width="100%" height="100%">"#);
        svg.push_str(&format!(r#"<div xmlns="{}">"#, XHTML_NS));
        svg.push_str(&markup);
        svg.push_str("</div></foreignObject>");
    }
    svg.push_str("</svg>");

    Ok(VectorDocument {
        width,
        height,
        svg,
        embeds_html,
    })
}
