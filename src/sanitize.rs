//! Markup sanitizer
//!
//! Engine output is embedded into a vector document that is later decoded by
//! the rasterizer, so anything executable must be gone before composition.
//! Sanitization never fails: unsafe constructs are removed, not rejected.
//!
//! Two modes are used, picked from the input:
//!
//! - markup that already carries SVG or MathML structure gets a light textual
//!   pass (neutralize URI schemes, strip inline event handlers);
//! - anything else is parsed as an HTML fragment and re-serialized as XHTML
//!   with attributes and inline styles filtered through allow-lists.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;

/// Replacement for neutralized executable URI schemes
pub const BLOCKED_SCHEME: &str = "blocked:";

/// Elements removed wholesale in both modes
const EXECUTABLE_ELEMENTS: &[&str] = &["script", "iframe", "frame", "object", "embed", "link"];

/// Attributes kept by the structural pass (compared lowercase)
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "class",
    "style",
    "aria-hidden",
    "xmlns",
    "viewbox",
    "width",
    "height",
    "fill",
    "d",
];

/// Inline style properties kept by the structural pass. `font*` is matched
/// by prefix in [`is_allowed_style_property`].
const ALLOWED_STYLE_PROPERTIES: &[&str] = &[
    "color",
    "background-color",
    "text-align",
    "line-height",
    "vertical-align",
    "white-space",
    "margin",
    "padding",
    "border",
    "display",
    "position",
    "top",
    "left",
    "right",
    "bottom",
    "width",
    "height",
    "min-width",
    "min-height",
    "max-width",
    "max-height",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "hr", "img", "input", "meta", "param", "source", "track", "wbr",
];

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:javascript|vbscript)\s*:").expect("valid scheme regex"))
}

fn event_handler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(<[^<>]*?[\s"'])on[a-z0-9_-]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#)
            .expect("valid event handler regex")
    })
}

fn paired_executable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(?:script|iframe|frame|object)\b[^>]*>.*?</(?:script|iframe|frame|object)\s*>")
            .expect("valid element regex")
    })
}

fn stray_executable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?(?:script|iframe|frame|object|embed|link)\b[^>]*>")
            .expect("valid element regex")
    })
}

/// Sanitize engine markup.
///
/// The pass is repeated until its output stops changing, so
/// `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(markup: &str) -> String {
    let mut current = sanitize_once(markup);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether the input is treated as vector/math markup (light pass)
pub fn is_structured_markup(markup: &str) -> bool {
    markup.contains("<svg") || markup.contains("<math")
}

/// Whether `value` mentions an executable URI scheme
pub fn contains_executable_scheme(value: &str) -> bool {
    scheme_re().is_match(value)
}

/// Replace every executable URI scheme with [`BLOCKED_SCHEME`]
pub fn neutralize_schemes(value: &str) -> String {
    scheme_re().replace_all(value, BLOCKED_SCHEME).into_owned()
}

fn sanitize_once(markup: &str) -> String {
    if is_structured_markup(markup) {
        light_pass(markup)
    } else {
        structural_pass(markup)
    }
}

// Every rewrite below shortens the string, so each loop ends.
fn light_pass(markup: &str) -> String {
    let mut current = markup.to_string();
    if stray_executable_re().is_match(&current) {
        log::warn!("sanitizer removed executable elements from vector markup");
        while stray_executable_re().is_match(&current) {
            let without_paired = paired_executable_re().replace_all(&current, "");
            current = stray_executable_re()
                .replace_all(&without_paired, "")
                .into_owned();
        }
    }
    current = scheme_re().replace_all(&current, BLOCKED_SCHEME).into_owned();
    // one handler per start tag goes per round
    while event_handler_re().is_match(&current) {
        current = event_handler_re().replace_all(&current, "${1}").into_owned();
    }
    current
}

fn structural_pass(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut out = String::with_capacity(markup.len());
    let mut dropped = 0usize;
    write_children(fragment.root_element(), &mut out, &mut dropped);
    if dropped > 0 {
        log::debug!("sanitizer dropped {} unsafe or unknown attribute(s)", dropped);
    }
    neutralize_schemes(&out)
}

fn write_children(element: ElementRef<'_>, out: &mut String, dropped: &mut usize) {
    let raw_text = element.value().name() == "style";
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_element(child_el, out, dropped);
                }
            }
            // comments, doctypes and processing instructions are dropped
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String, dropped: &mut usize) {
    let name = element.value().name();
    if EXECUTABLE_ELEMENTS.contains(&name) {
        log::warn!("sanitizer removed <{}> element", name);
        return;
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    for (attr_name, value) in element.value().attrs() {
        match filter_attribute(attr_name, value) {
            Some(kept) => attrs.push(kept),
            None => *dropped += 1,
        }
    }
    attrs.sort();

    out.push('<');
    out.push_str(name);
    for (attr_name, value) in &attrs {
        out.push(' ');
        out.push_str(attr_name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    write_children(element, out, dropped);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Decide whether an attribute survives the structural pass, returning the
/// (possibly rewritten) name/value pair.
fn filter_attribute(name: &str, value: &str) -> Option<(String, String)> {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("on") || contains_executable_scheme(value) {
        return None;
    }
    if lower == "style" {
        let style = filter_style(value);
        if style.is_empty() {
            return None;
        }
        return Some((lower, style));
    }
    if ALLOWED_ATTRIBUTES.contains(&lower.as_str()) || lower.starts_with("data-") {
        return Some((lower, value.to_string()));
    }
    None
}

/// Keep only allow-listed declarations with inert values.
pub fn filter_style(style: &str) -> String {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let key = prop.trim().to_ascii_lowercase();
            let val = val.trim();
            if key.is_empty() || val.is_empty() {
                return None;
            }
            if is_allowed_style_property(&key) && is_safe_style_value(val) {
                Some(format!("{}: {}", key, val))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_allowed_style_property(key: &str) -> bool {
    key.starts_with("font") || ALLOWED_STYLE_PROPERTIES.contains(&key)
}

fn is_safe_style_value(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    !contains_executable_scheme(&lower) && !lower.contains("expression(")
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
