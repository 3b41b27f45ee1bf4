//! Built-in diagnostic ticket for `POST /test-print`.

use chrono::{DateTime, Local};

use crate::render::template::escape_html;

/// Markup for the diagnostic ticket addressed to `printer`.
pub fn test_ticket_markup(printer: &str, now: DateTime<Local>) -> String {
    format!(
        r#"<div style="font-family: monospace; text-align: center; padding: 20px;">
  <div style="font-size: 18px; font-weight: bold;">PRINT TEST</div>
  <hr>
  <div>printd {version}</div>
  <div style="margin-top: 10px;">Printer: {printer}</div>
  <div>Date: {date}</div>
  <hr>
  <div style="font-size: 12px;">If you can read this,</div>
  <div style="font-size: 12px;">the printer is set up correctly.</div>
  <div style="margin-top: 20px;">================================</div>
</div>"#,
        version = env!("CARGO_PKG_VERSION"),
        printer = escape_html(printer),
        date = now.format("%Y-%m-%d %H:%M:%S"),
    )
}
