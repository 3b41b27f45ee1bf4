mod config;
mod errors;
mod platform;
mod printing;
mod render;
mod routes;
mod state;
mod thermal;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::platform::{CupsPlatform, PrintPlatform};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; invalid values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting printd v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the CUPS backend
    let cups = CupsPlatform::new(config.spool_dir.clone(), config.line_width)
        .context("Failed to prepare the print spool directory")?;
    info!("CUPS backend ready (spool: {})", cups.spool_dir().display());
    let platform: Arc<dyn PrintPlatform> = Arc::new(cups);

    log_printers(platform.as_ref(), &config).await;

    // Build app state; this starts the print queue worker
    let state = AppState::new(config.clone(), platform);
    let print_service = Arc::clone(&state.print_service);

    let app = build_router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    info!(
        "Listening on {addr} (mode: {:?}, line width: {})",
        config.render_mode, config.line_width
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Finish whatever is still queued before exiting
    print_service.shutdown().await;
    info!("printd stopped");

    Ok(())
}

/// Startup banner: the printers CUPS knows about and which one jobs go to.
async fn log_printers(platform: &dyn PrintPlatform, config: &Config) {
    match platform.list_printers().await {
        Ok(printers) if printers.is_empty() => warn!("No printers detected"),
        Ok(printers) => {
            for printer in &printers {
                info!(
                    "Printer detected: {} [{}]{}",
                    printer.name,
                    printer.status,
                    if printer.is_default { " (OS default)" } else { "" }
                );
            }
        }
        Err(e) => warn!("Could not list printers: {e}"),
    }

    match &config.printer {
        Some(name) => info!("Default printer: {name}"),
        None => info!("Default printer: OS default"),
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
