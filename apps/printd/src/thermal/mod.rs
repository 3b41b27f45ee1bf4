// Text-mode rendering: markup normalization and fixed-width receipt layout.
// Both passes are pure string transforms and never fail.

pub mod formatter;
pub mod normalizer;

pub use formatter::{format, DEFAULT_LINE_WIDTH};
pub use normalizer::normalize;

/// Runs the full text-mode pipeline: markup → plain text → thermal document.
pub fn markup_to_thermal(markup: &str, line_width: usize) -> String {
    format(&normalize(markup, line_width), line_width)
}
