//! Content Height Estimator — sizes the page to the rendered ticket.
//!
//! Thermal rolls are continuous, so instead of a fixed page the length is
//! derived from the content's pixel extent:
//!
//! `max(ceil(px × 264.58 µm) + 5mm, 50mm)`
//!
//! There is no upper cap; long tickets simply get a long page.

use serde::Serialize;

use crate::platform::{PlatformError, RenderSurface};

/// Physical width of an 80mm roll.
pub const PAGE_WIDTH_MICRONS: u32 = 80_000;

/// Microns per pixel at the 96 DPI reference density, in hundredths
/// (264.58 µm/px).
const CENTI_MICRONS_PER_PIXEL: u64 = 26_458;

/// Added below the content so the last line is never clipped.
pub const BOTTOM_BUFFER_MICRONS: u64 = 5_000;

/// Shortest page ever produced.
pub const MIN_PAGE_LENGTH_MICRONS: u64 = 50_000;

/// Page size handed to the print call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    pub width_microns: u32,
    pub height_microns: u64,
}

impl PageSize {
    pub fn for_content_height(content_px: u32) -> Self {
        Self {
            width_microns: PAGE_WIDTH_MICRONS,
            height_microns: page_length_microns(content_px),
        }
    }

    /// Length rounded up to whole millimetres.
    pub fn height_mm(&self) -> u64 {
        self.height_microns.div_ceil(1_000)
    }

    pub fn width_mm(&self) -> u32 {
        self.width_microns.div_ceil(1_000)
    }
}

/// Converts a rendered content height in pixels to a page length in microns.
pub fn page_length_microns(content_px: u32) -> u64 {
    let content = (u64::from(content_px) * CENTI_MICRONS_PER_PIXEL).div_ceil(100);
    (content + BOTTOM_BUFFER_MICRONS).max(MIN_PAGE_LENGTH_MICRONS)
}

/// Measures the loaded document and returns the page it needs.
pub async fn estimate_height(surface: &mut dyn RenderSurface) -> Result<PageSize, PlatformError> {
    let content_px = surface.content_height_px().await?;
    Ok(PageSize::for_content_height(content_px))
}
