use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service identity, the effective print settings and queue state.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.config.port,
        "printer": state.config.printer,
        "mode": state.config.render_mode,
        "backend": state.platform.name(),
        "queue": state.print_service.status(),
    }))
}
