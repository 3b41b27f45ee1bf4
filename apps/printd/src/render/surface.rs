//! Render Surface Manager — owns the one reusable rendering surface.
//!
//! Creating a surface is the expensive part of a print (spinning up the
//! engine), so the manager keeps a single surface alive and reloads it for
//! every job. It is created ahead of the first job by [`SurfaceManager::warm_up`]
//! and recreated lazily whenever the previous one died.
//!
//! The manager is owned by the print worker, which is the only code that
//! binds documents to the surface.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::platform::{PlatformError, PrintPlatform, RenderSurface};
use crate::render::template::compose;
use crate::render::Document;

pub struct SurfaceManager {
    platform: Arc<dyn PrintPlatform>,
    surface: Option<Box<dyn RenderSurface>>,
    /// Surfaces created over the manager's lifetime.
    generation: u64,
}

impl SurfaceManager {
    pub fn new(platform: Arc<dyn PrintPlatform>) -> Self {
        Self {
            platform,
            surface: None,
            generation: 0,
        }
    }

    /// Pre-creates the surface so the first job pays no cold-start cost.
    /// Failure is not fatal; the next job retries creation.
    pub async fn warm_up(&mut self) {
        if let Err(e) = self.get_surface().await {
            warn!(error = %e, "render surface warm-up failed; will retry on first job");
        }
    }

    /// Returns the live surface, creating one if none exists or the last one
    /// was destroyed.
    pub async fn get_surface(
        &mut self,
    ) -> Result<&mut (dyn RenderSurface + 'static), PlatformError> {
        let needs_new = match &self.surface {
            Some(surface) => !surface.is_alive(),
            None => true,
        };

        if needs_new {
            if self.surface.take().is_some() {
                warn!(
                    generation = self.generation,
                    "render surface was destroyed; recreating"
                );
            }
            let fresh = self.platform.create_surface().await?;
            self.generation += 1;
            info!(
                generation = self.generation,
                backend = self.platform.name(),
                "render surface created"
            );
            self.surface = Some(fresh);
        }

        match self.surface.as_deref_mut() {
            Some(surface) => Ok(surface),
            None => Err(PlatformError::Rejected(
                "render surface unavailable".to_string(),
            )),
        }
    }

    /// Loads `document` into the page template and waits for load completion.
    ///
    /// On failure the surface is kept; it remains usable for the next job.
    pub async fn load_document(&mut self, document: &Document) -> Result<(), PlatformError> {
        let composed = compose(document);
        let surface = self.get_surface().await?;
        surface.load(&composed).await?;
        debug!(kind = composed.kind(), bytes = composed.as_str().len(), "document loaded");
        Ok(())
    }

    /// Drops the current surface; the next access creates a fresh one.
    pub fn discard(&mut self) {
        if self.surface.take().is_some() {
            warn!(generation = self.generation, "render surface discarded");
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
