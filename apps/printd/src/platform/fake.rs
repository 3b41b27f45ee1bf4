//! Scripted in-memory platform used by the queue, surface and route tests.
//!
//! Behaviour is driven by markers in the document text:
//! - `FAIL_LOAD`  → `load` reports a navigation failure
//! - `FAIL_PRINT` → `print` reports "printer offline"
//! - `CRASH`      → `print` fails and the surface dies
//! - `HANG`       → `print` never completes
//! - `PANIC`      → `print` panics

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::platform::{PlatformError, PrintOptions, PrintPlatform, PrinterInfo, RenderSurface};
use crate::render::Document;

/// Pixels per text line reported by fake surfaces.
pub const FAKE_LINE_HEIGHT_PX: u32 = 10;

#[derive(Default)]
struct FakeState {
    surfaces_created: AtomicUsize,
    kill_epoch: AtomicUsize,
    fail_creation: AtomicBool,
    active_loads: AtomicUsize,
    max_active_loads: AtomicUsize,
    load_delay: Mutex<Duration>,
    events: Mutex<Vec<String>>,
    loaded: Mutex<Vec<String>>,
    printed: Mutex<Vec<(String, PrintOptions)>>,
    printers: Mutex<Vec<PrinterInfo>>,
    fail_listing: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_printers(printers: Vec<PrinterInfo>) -> Self {
        let platform = Self::new();
        *platform.state.printers.lock().unwrap() = printers;
        platform
    }

    /// Makes every load sleep, so concurrent submissions pile up.
    pub fn set_load_delay(&self, delay: Duration) {
        *self.state.load_delay.lock().unwrap() = delay;
    }

    pub fn fail_surface_creation(&self, fail: bool) {
        self.state.fail_creation.store(fail, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Destroys every surface created so far.
    pub fn kill_surfaces(&self) {
        self.state.kill_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn surfaces_created(&self) -> usize {
        self.state.surfaces_created.load(Ordering::SeqCst)
    }

    pub fn max_active_loads(&self) -> usize {
        self.state.max_active_loads.load(Ordering::SeqCst)
    }

    /// `load:<doc>` / `print:<doc>` entries in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }

    pub fn loaded_documents(&self) -> Vec<String> {
        self.state.loaded.lock().unwrap().clone()
    }

    pub fn printed(&self) -> Vec<(String, PrintOptions)> {
        self.state.printed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrintPlatform for FakePlatform {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_printers(&self) -> Result<Vec<PrinterInfo>, PlatformError> {
        if self.state.fail_listing.load(Ordering::SeqCst) {
            return Err(PlatformError::Rejected("print system unavailable".to_string()));
        }
        Ok(self.state.printers.lock().unwrap().clone())
    }

    async fn create_surface(&self) -> Result<Box<dyn RenderSurface>, PlatformError> {
        if self.state.fail_creation.load(Ordering::SeqCst) {
            return Err(PlatformError::Rejected("engine failed to start".to_string()));
        }
        self.state.surfaces_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSurface {
            state: Arc::clone(&self.state),
            epoch: self.state.kill_epoch.load(Ordering::SeqCst),
            crashed: false,
            content: None,
        }))
    }
}

struct FakeSurface {
    state: Arc<FakeState>,
    epoch: usize,
    crashed: bool,
    content: Option<String>,
}

impl FakeSurface {
    fn record(&self, event: String) {
        self.state.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl RenderSurface for FakeSurface {
    async fn load(&mut self, document: &Document) -> Result<(), PlatformError> {
        let active = self.state.active_loads.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active_loads.fetch_max(active, Ordering::SeqCst);

        let delay = *self.state.load_delay.lock().unwrap();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        let text = document.as_str().to_string();
        self.record(format!("load:{}", label_of(&text)));
        self.state.active_loads.fetch_sub(1, Ordering::SeqCst);

        if text.contains("FAIL_LOAD") {
            self.content = None;
            return Err(PlatformError::Rejected("navigation failed".to_string()));
        }
        self.state.loaded.lock().unwrap().push(text.clone());
        self.content = Some(text);
        Ok(())
    }

    async fn content_height_px(&mut self) -> Result<u32, PlatformError> {
        let content = self.content.as_ref().ok_or(PlatformError::NotLoaded)?;
        Ok(content.lines().count() as u32 * FAKE_LINE_HEIGHT_PX)
    }

    async fn print(&mut self, options: &PrintOptions) -> Result<(), PlatformError> {
        let content = self.content.clone().ok_or(PlatformError::NotLoaded)?;

        if content.contains("PANIC") {
            panic!("render backend panicked");
        }
        if content.contains("HANG") {
            std::future::pending::<()>().await;
        }
        self.record(format!("print:{}", label_of(&content)));

        if content.contains("CRASH") {
            self.crashed = true;
            return Err(PlatformError::Rejected("render process gone".to_string()));
        }
        if content.contains("FAIL_PRINT") {
            return Err(PlatformError::Rejected("printer offline".to_string()));
        }

        self.state
            .printed
            .lock()
            .unwrap()
            .push((content, options.clone()));
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.crashed && self.epoch == self.state.kill_epoch.load(Ordering::SeqCst)
    }
}

/// First line of a document, which tests use as its label.
fn label_of(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}
