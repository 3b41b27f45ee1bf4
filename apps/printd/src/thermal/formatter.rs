//! Thermal Text Formatter — lays out normalized text for a fixed-width receipt roll.
//!
//! Each line is trimmed and then handled independently:
//! - `Label $12.50` lines get the price pushed to the right margin
//! - short all-caps lines without a price are centered
//! - anything else passes through
//!
//! The finished document always ends with the paper feed the cutter needs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default characters per line on an 80mm roll.
pub const DEFAULT_LINE_WIDTH: usize = 32;

/// Terminates the last line and feeds four blank lines past the cutter.
pub const CUTTER_FEED: &str = "\n\n\n\n\n";

/// Headers must be at least this many columns shorter than the line width.
const HEADER_MARGIN: usize = 4;

static PRICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\$(\d+(?:\.\d{1,2})?)\s*$").expect("valid regex"));

/// Formats plain text into a thermal document `line_width` columns wide.
pub fn format(plain_text: &str, line_width: usize) -> String {
    let lines: Vec<String> = plain_text
        .split('\n')
        .map(|line| format_line(line, line_width))
        .collect();

    let mut document = lines.join("\n");
    document.push_str(CUTTER_FEED);
    document
}

/// Applies price alignment or header centering to a single line.
pub fn format_line(line: &str, line_width: usize) -> String {
    let line = line.trim();

    if let Some(aligned) = align_price(line, line_width) {
        return aligned;
    }

    if is_header(line, line_width) {
        let padding = line_width.saturating_sub(char_len(line)) / 2;
        return format!("{}{}", " ".repeat(padding), line);
    }

    line.to_string()
}

/// Right-aligns a trailing `$amount`, or returns `None` if the line has no
/// price or the label and price leave no room for a gap.
fn align_price(line: &str, line_width: usize) -> Option<String> {
    let caps = PRICE_LINE.captures(line)?;
    let label = caps.get(1)?.as_str().trim();
    let price = format!("${}", caps.get(2)?.as_str());

    let used = char_len(label) + char_len(&price);
    if used >= line_width {
        return None;
    }

    Some(format!("{}{}{}", label, " ".repeat(line_width - used), price))
}

fn is_header(line: &str, line_width: usize) -> bool {
    !line.is_empty()
        && line == line.to_uppercase()
        && char_len(line) < line_width.saturating_sub(HEADER_MARGIN)
        && !line.contains('$')
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
