use std::sync::Arc;

use crate::config::Config;
use crate::platform::PrintPlatform;
use crate::printing::{PrintService, QueueOptions};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// OS print backend. CUPS in production, scripted in tests.
    pub platform: Arc<dyn PrintPlatform>,
    /// The single print queue; every job goes through it.
    pub print_service: Arc<PrintService>,
}

impl AppState {
    /// Starts the print queue on `platform` and bundles it with the config.
    pub fn new(config: Config, platform: Arc<dyn PrintPlatform>) -> Self {
        let print_service = PrintService::start(
            Arc::clone(&platform),
            QueueOptions {
                capacity: config.queue_capacity,
                print_timeout: config.print_timeout,
            },
        );

        AppState {
            config,
            platform,
            print_service: Arc::new(print_service),
        }
    }
}
