//! CUPS backend — prints through `lp` and enumerates printers with `lpstat`.
//!
//! CUPS has no markup engine, so the surface renders text-mode: markup is run
//! through the thermal normalizer and formatter, pre-formatted text is used
//! as-is. Markup that is only a `<pre>` block skips the normalizer so its
//! column alignment survives.
//!
//! Every `lp`/`lpstat` child is killed when its future is dropped, so a
//! timed-out print cannot outlive its job or its spool file. The rendered ticket is spooled to a temp file that lives exactly as
//! long as it is loaded on the surface; reloading or dropping the surface
//! removes it.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::platform::{PlatformError, PrintOptions, PrintPlatform, PrinterInfo, RenderSurface};
use crate::render::template::preformatted_text;
use crate::render::Document;
use crate::thermal::{format, markup_to_thermal};

const LP: &str = "lp";
const LPSTAT: &str = "lpstat";

/// Height of one 12px monospace text line at 96 DPI, including leading.
pub const LINE_HEIGHT_PX: u32 = 14;

/// Top and bottom body padding of the page template (2mm each, ≈ 8px).
const PAGE_PADDING_PX: u32 = 16;

pub struct CupsPlatform {
    spool_dir: PathBuf,
    line_width: usize,
}

impl CupsPlatform {
    /// Creates the backend, making sure the spool directory exists.
    pub fn new(spool_dir: impl Into<PathBuf>, line_width: usize) -> Result<Self, PlatformError> {
        let spool_dir = spool_dir.into();
        std::fs::create_dir_all(&spool_dir)?;
        Ok(Self {
            spool_dir,
            line_width,
        })
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }
}

#[async_trait]
impl PrintPlatform for CupsPlatform {
    fn name(&self) -> &'static str {
        "cups"
    }

    #[instrument(skip(self))]
    async fn list_printers(&self) -> Result<Vec<PrinterInfo>, PlatformError> {
        let printers = run_lpstat(&["-p"]).await?;
        // A missing system default is not an error.
        let default = run_lpstat(&["-d"])
            .await
            .ok()
            .and_then(|out| parse_default_destination(&out));

        let printers = parse_printer_lines(&printers)
            .into_iter()
            .map(|(name, status)| PrinterInfo {
                is_default: default.as_deref() == Some(name.as_str()),
                name,
                status,
            })
            .collect::<Vec<_>>();

        debug!(count = printers.len(), "printers listed");
        Ok(printers)
    }

    async fn create_surface(&self) -> Result<Box<dyn RenderSurface>, PlatformError> {
        std::fs::create_dir_all(&self.spool_dir)?;
        Ok(Box::new(CupsSurface {
            spool_dir: self.spool_dir.clone(),
            line_width: self.line_width,
            spool: None,
            line_count: 0,
            lp_program: PathBuf::from(LP),
        }))
    }
}

struct CupsSurface {
    spool_dir: PathBuf,
    line_width: usize,
    spool: Option<NamedTempFile>,
    line_count: usize,
    lp_program: PathBuf,
}

#[async_trait]
impl RenderSurface for CupsSurface {
    async fn load(&mut self, document: &Document) -> Result<(), PlatformError> {
        let text = match document {
            Document::Markup(markup) => match preformatted_text(markup) {
                Some(text) => format(&text, self.line_width),
                None => markup_to_thermal(markup, self.line_width),
            },
            Document::Thermal(text) => text.clone(),
        };
        let line_count = text.lines().count();

        // Release the previous spool file before writing the next one.
        self.spool = None;
        self.line_count = 0;

        let dir = self.spool_dir.clone();
        let spool = tokio::task::spawn_blocking(move || write_spool_file(&dir, &text))
            .await
            .map_err(|e| PlatformError::Rejected(format!("spool writer panicked: {e}")))??;

        debug!(path = %spool.path().display(), lines = line_count, "ticket spooled");
        self.spool = Some(spool);
        self.line_count = line_count;
        Ok(())
    }

    async fn content_height_px(&mut self) -> Result<u32, PlatformError> {
        if self.spool.is_none() {
            return Err(PlatformError::NotLoaded);
        }
        let lines = u32::try_from(self.line_count).unwrap_or(u32::MAX);
        Ok(lines
            .saturating_mul(LINE_HEIGHT_PX)
            .saturating_add(PAGE_PADDING_PX))
    }

    #[instrument(skip(self, options), fields(printer = ?options.printer, copies = options.copies))]
    async fn print(&mut self, options: &PrintOptions) -> Result<(), PlatformError> {
        let spool = self.spool.as_ref().ok_or(PlatformError::NotLoaded)?;
        if !options.silent {
            debug!("lp has no print dialog; printing silently");
        }

        let args = lp_args(options, spool.path());
        let output = command(&self.lp_program)
            .args(&args)
            .output()
            .await
            .map_err(|source| PlatformError::Spawn {
                command: LP,
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                command: LP,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(
            request = %String::from_utf8_lossy(&output.stdout).trim(),
            "lp accepted job"
        );
        Ok(())
    }
}

fn write_spool_file(dir: &Path, text: &str) -> Result<NamedTempFile, PlatformError> {
    let mut file = tempfile::Builder::new()
        .prefix("ticket-")
        .suffix(".txt")
        .tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// A CUPS client command whose child dies with the future awaiting it.
fn command(program: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command
}

async fn run_lpstat(args: &[&str]) -> Result<String, PlatformError> {
    let output = command(LPSTAT)
        .args(args)
        .output()
        .await
        .map_err(|source| PlatformError::Spawn {
            command: LPSTAT,
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    // CUPS exits non-zero when no printer is installed at all.
    if stderr.contains("No destinations added") {
        return Ok(String::new());
    }
    Err(PlatformError::CommandFailed {
        command: LPSTAT,
        status: output.status.to_string(),
        stderr,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Command line construction and output parsing
// ────────────────────────────────────────────────────────────────────────────

/// Arguments for `lp`. The page is sized to the ticket with a custom media size.
pub(crate) fn lp_args(options: &PrintOptions, file: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(printer) = &options.printer {
        args.push("-d".to_string());
        args.push(printer.clone());
    }
    args.push("-n".to_string());
    args.push(options.copies.max(1).to_string());
    args.push("-o".to_string());
    args.push(format!(
        "media=Custom.{}x{}mm",
        options.page.width_mm(),
        options.page.height_mm()
    ));
    args.push("-t".to_string());
    args.push(options.title.clone());
    args.push(file.display().to_string());
    args
}

/// Parses `lpstat -p` into `(name, status)` pairs.
///
/// ```text
/// printer ImpresoraTicket is idle.  enabled since Tue 01 Oct 2024
/// printer Kitchen now printing Kitchen-42.  enabled since ...
/// printer Office disabled since Mon 30 Sep 2024 -
/// ```
pub(crate) fn parse_printer_lines(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("printer ")?;
            let mut parts = rest.split_whitespace();
            let name = parts.next()?.to_string();
            let tail = parts.collect::<Vec<_>>().join(" ");

            let status = if tail.starts_with("disabled") {
                "disabled"
            } else if tail.starts_with("now printing") {
                "printing"
            } else if tail.starts_with("is idle") {
                "idle"
            } else {
                "unknown"
            };
            Some((name, status.to_string()))
        })
        .collect()
}

/// Parses `lpstat -d` (`system default destination: NAME`).
pub(crate) fn parse_default_destination(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.strip_prefix("system default destination:")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    })
}
