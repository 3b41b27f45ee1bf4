// Render surface management: the shared surface, the 80mm page template and
// page-length estimation from rendered content.

pub mod height;
pub mod surface;
pub mod template;

pub use height::{estimate_height, PageSize};
pub use surface::SurfaceManager;

/// A document queued for printing. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Markup rendered by the engine inside the 80mm page template.
    Markup(String),
    /// Pre-formatted fixed-width text, already laid out for the roll.
    Thermal(String),
}

impl Document {
    /// Raw content, regardless of kind.
    pub fn as_str(&self) -> &str {
        match self {
            Document::Markup(s) | Document::Thermal(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Document::Markup(_) => "markup",
            Document::Thermal(_) => "thermal",
        }
    }
}
