//! 80mm page template wrapped around markup before it reaches the surface.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::Document;

/// A page or fragment whose body is a single `<pre>` block.
static PRE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:.*<body[^>]*>)?\s*<pre[^>]*>(.*?)</pre>\s*(?:</body>.*)?$")
        .expect("valid regex")
});

/// Fixes the physical width, removes default margins and forces background
/// and color reproduction. `{content}` is replaced with the caller's markup.
pub const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <style>
    * { margin: 0; padding: 0; box-sizing: border-box; }
    @page { size: 80mm auto; margin: 0; }
    @media print {
      html, body { width: 80mm; margin: 0; padding: 0; }
    }
    body {
      font-family: 'Courier New', monospace;
      font-size: 12px;
      width: 80mm;
      padding: 2mm;
      -webkit-print-color-adjust: exact;
      print-color-adjust: exact;
    }
    body > * { width: 100%; max-width: 76mm; margin: 0 auto; }
    table { width: 100%; text-align: left; }
  </style>
</head>
<body>
{content}
</body>
</html>"#;

/// Wraps a document for loading: markup goes into the page template,
/// thermal text is already laid out and passes through untouched.
pub fn compose(document: &Document) -> Document {
    match document {
        Document::Markup(markup) => Document::Markup(PAGE_TEMPLATE.replace("{content}", markup)),
        Document::Thermal(text) => Document::Thermal(text.clone()),
    }
}

/// Wraps plain text in a monospace block so the engine keeps its spacing.
///
/// The text is escaped, so `<` and `&` in a receipt print literally.
pub fn monospace_block(text: &str) -> String {
    format!(
        r#"<pre style="font-family: monospace; font-size: 12px; margin: 0;">{}</pre>"#,
        escape_html(text)
    )
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Recovers the plain text of a markup document that holds nothing but one
/// `<pre>` block, bare or inside the page template. Returns `None` for any
/// other markup.
pub fn preformatted_text(markup: &str) -> Option<String> {
    let inner = PRE_ONLY.captures(markup)?.get(1)?.as_str();
    if inner.contains('<') {
        return None;
    }
    Some(
        inner
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}
