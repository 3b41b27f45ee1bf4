//! Platform seam — the OS print subsystem and the rendering engine behind it.
//!
//! The engine is reached only through two traits:
//! - [`PrintPlatform`] enumerates printers and creates render surfaces.
//! - [`RenderSurface`] loads one document at a time, reports its rendered
//!   extent and prints it.
//!
//! The queue never talks to a concrete backend directly; `main` picks one
//! (CUPS in production) and hands it over as `Arc<dyn PrintPlatform>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::height::PageSize;
use crate::render::Document;

pub mod cups;
#[cfg(test)]
pub mod fake;

pub use cups::CupsPlatform;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A printer as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterInfo {
    pub name: String,
    pub is_default: bool,
    /// Backend-specific state, e.g. `idle`, `printing`, `disabled`.
    pub status: String,
}

/// Everything the platform print call needs besides the loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// `None` prints to the OS default printer.
    pub printer: Option<String>,
    pub copies: u32,
    /// Bypass any OS print dialog.
    pub silent: bool,
    pub page: PageSize,
    /// Title shown in the OS print queue.
    pub title: String,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: &'static str,
        status: String,
        stderr: String,
    },

    #[error("spool file error: {0}")]
    Spool(#[from] std::io::Error),

    #[error("no document loaded on the render surface")]
    NotLoaded,

    /// Free-form failure reason reported by the engine.
    #[error("{0}")]
    Rejected(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// An off-screen rendering resource that holds one document at a time.
///
/// `load` must not return until the document has finished loading; callers
/// measure and print only after it resolves.
#[async_trait]
pub trait RenderSurface: Send {
    /// Replaces the surface content with `document`.
    async fn load(&mut self, document: &Document) -> Result<(), PlatformError>;

    /// Vertical extent of the loaded content in device pixels (96 DPI).
    async fn content_height_px(&mut self) -> Result<u32, PlatformError>;

    /// Prints the loaded content and waits for the platform to report back.
    async fn print(&mut self, options: &PrintOptions) -> Result<(), PlatformError>;

    /// False once the underlying resource has been destroyed and the surface
    /// must be recreated.
    fn is_alive(&self) -> bool {
        true
    }
}

/// The OS print subsystem plus its rendering engine.
#[async_trait]
pub trait PrintPlatform: Send + Sync {
    /// Short backend name for logs and `/health`.
    fn name(&self) -> &'static str;

    async fn list_printers(&self) -> Result<Vec<PrinterInfo>, PlatformError>;

    async fn create_surface(&self) -> Result<Box<dyn RenderSurface>, PlatformError>;
}

/// Picks the printer a job goes to: the requested one, else the configured
/// default. Empty names count as absent.
pub fn resolve_printer(requested: Option<&str>, default: Option<&str>) -> Option<String> {
    requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| default.map(str::trim).filter(|name| !name.is_empty()))
        .map(str::to_string)
}
