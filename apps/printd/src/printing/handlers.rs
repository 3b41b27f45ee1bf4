use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::RenderMode;
use crate::errors::AppError;
use crate::platform::{resolve_printer, PrinterInfo};
use crate::printing::test_ticket::test_ticket_markup;
use crate::printing::PrintJob;
use crate::render::template::monospace_block;
use crate::render::Document;
use crate::state::AppState;
use crate::thermal::{format, markup_to_thermal};

const NO_CONTENT: &str = "No content provided to print";

fn default_copies() -> u32 {
    1
}

fn default_silent() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub printer: Option<String>,
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default = "default_silent")]
    pub silent: bool,
}

#[derive(Debug, Deserialize)]
pub struct PrintTextRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub printer: Option<String>,
    #[serde(default = "default_copies")]
    pub copies: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestPrintRequest {
    #[serde(default)]
    pub printer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintResponse {
    pub success: bool,
    pub message: &'static str,
    pub printer: Option<String>,
    pub job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PrintersResponse {
    pub printers: Vec<PrinterInfo>,
    pub default: Option<String>,
}

/// GET /printers
pub async fn handle_list_printers(
    State(state): State<AppState>,
) -> Result<Json<PrintersResponse>, AppError> {
    let printers = state.platform.list_printers().await?;
    let default = state.config.printer.clone().or_else(|| {
        printers
            .iter()
            .find(|p| p.is_default)
            .map(|p| p.name.clone())
    });
    Ok(Json(PrintersResponse { printers, default }))
}

/// POST /print
pub async fn handle_print(
    State(state): State<AppState>,
    payload: Result<Json<PrintRequest>, JsonRejection>,
) -> Result<Json<PrintResponse>, AppError> {
    let Json(req) = payload?;
    let content = require_content(req.content)?;
    require_copies(req.copies)?;

    let document = match state.config.render_mode {
        RenderMode::Text => Document::Thermal(markup_to_thermal(&content, state.config.line_width)),
        RenderMode::Rich => Document::Markup(content),
    };

    submit_and_wait(&state, document, req.printer.as_deref(), req.copies, req.silent).await
}

/// POST /print-text
pub async fn handle_print_text(
    State(state): State<AppState>,
    payload: Result<Json<PrintTextRequest>, JsonRejection>,
) -> Result<Json<PrintResponse>, AppError> {
    let Json(req) = payload?;
    let content = require_content(req.content)?;
    require_copies(req.copies)?;

    let document = match state.config.render_mode {
        RenderMode::Text => Document::Thermal(format(&content, state.config.line_width)),
        RenderMode::Rich => Document::Markup(monospace_block(&content)),
    };

    submit_and_wait(&state, document, req.printer.as_deref(), req.copies, true).await
}

/// POST /test-print
pub async fn handle_test_print(
    State(state): State<AppState>,
    payload: Result<Json<TestPrintRequest>, JsonRejection>,
) -> Result<Json<PrintResponse>, AppError> {
    // The body is optional; only a body that is present must be valid.
    let req = match payload {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => TestPrintRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let target = resolve_printer(req.printer.as_deref(), state.config.printer.as_deref());

    let markup = test_ticket_markup(target.as_deref().unwrap_or("OS default"), Local::now());
    let document = match state.config.render_mode {
        RenderMode::Text => Document::Thermal(markup_to_thermal(&markup, state.config.line_width)),
        RenderMode::Rich => Document::Markup(markup),
    };

    submit_and_wait(&state, document, target.as_deref(), 1, true).await
}

fn require_content(content: Option<String>) -> Result<String, AppError> {
    match content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(AppError::Validation(NO_CONTENT.to_string())),
    }
}

fn require_copies(copies: u32) -> Result<(), AppError> {
    if copies == 0 {
        return Err(AppError::Validation("copies must be at least 1".to_string()));
    }
    Ok(())
}

/// Enqueues the document and holds the request open until the job resolves.
async fn submit_and_wait(
    state: &AppState,
    document: Document,
    requested_printer: Option<&str>,
    copies: u32,
    silent: bool,
) -> Result<Json<PrintResponse>, AppError> {
    let printer = resolve_printer(requested_printer, state.config.printer.as_deref());
    let job = PrintJob::new(document, printer.clone(), copies, silent);

    info!(
        job_id = %job.id,
        printer = ?printer,
        copies,
        kind = job.document.kind(),
        "print request accepted"
    );

    let handle = state.print_service.submit(job)?;
    let job_id = handle.id();
    handle.wait().await?;

    Ok(Json(PrintResponse {
        success: true,
        message: "Print job sent",
        printer,
        job_id,
    }))
}
