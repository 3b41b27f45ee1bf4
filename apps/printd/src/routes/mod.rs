pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::printing::handlers;
use crate::state::AppState;

/// Request bodies carry whole receipts as markup.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/printers", get(handlers::handle_list_printers))
        .route("/print", post(handlers::handle_print))
        .route("/print-text", post(handlers::handle_print_text))
        .route("/test-print", post(handlers::handle_test_print))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
