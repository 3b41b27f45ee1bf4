//! Markup Normalizer — flattens arbitrary HTML into plain, line-oriented text.
//!
//! # Rules (applied in order)
//! 1. `<script>` / `<style>` blocks are removed with their content
//! 2. `<br>` becomes a newline
//! 3. closing block tags (`p`, `div`, `li`, `tr`, `h1`–`h6`) become newlines
//! 4. `<hr>` becomes a full-width `─` separator on its own line
//! 5. closing cell tags (`td`, `th`) become a `" | "` column separator
//! 6. every remaining tag is stripped
//! 7. a fixed entity set is decoded; unknown entities are left alone
//! 8. whitespace is collapsed and the document trimmed
//!
//! The normalizer never fails: malformed markup just loses its tags.

use once_cell::sync::Lazy;
use regex::Regex;

/// Character used to draw `<hr>` separators.
pub const SEPARATOR_CHAR: char = '─';

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static BLOCK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(div|p|li|tr|h[1-6])>").expect("valid regex"));
static HORIZONTAL_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<hr[^>]*>").expect("valid regex"));
static CELL_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</t[dh]>").expect("valid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Entities decoded by the normalizer, in decoding order.
///
/// `&amp;` is decoded before the others, so `&amp;lt;` ends up as `<`.
const ENTITIES: [(&str, &str); 8] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&mdash;", "—"),
    ("&ndash;", "–"),
];

/// Converts raw markup into plain text suitable for a `line_width`-column printer.
pub fn normalize(raw_markup: &str, line_width: usize) -> String {
    let text = raw_markup.replace("\r\n", "\n");

    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");

    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = BLOCK_CLOSE.replace_all(&text, "\n");
    let separator = format!("\n{}\n", separator_line(line_width));
    let text = HORIZONTAL_RULE.replace_all(&text, separator.as_str());

    let text = CELL_CLOSE.replace_all(&text, " | ");
    let text = ANY_TAG.replace_all(&text, "");

    let text = decode_entities(&text);
    collapse_whitespace(&text)
}

/// A full-width separator line.
pub fn separator_line(line_width: usize) -> String {
    SEPARATOR_CHAR.to_string().repeat(line_width)
}

fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, decoded)| {
            acc.replace(entity, decoded)
        })
}

fn collapse_whitespace(text: &str) -> String {
    let text = INLINE_SPACE.replace_all(text, " ");
    let text = text.replace("\n ", "\n").replace(" \n", "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}
