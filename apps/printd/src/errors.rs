use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::platform::PlatformError;
use crate::printing::JobError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Print queue is full ({0} jobs pending)")]
    QueueFull(usize),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Print error: {0}")]
    Print(String),

    #[error("Printer listing error: {0}")]
    Printers(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JobError> for AppError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::Load(reason) => AppError::Load(reason),
            JobError::Print(e) => AppError::Print(e.to_string()),
            JobError::QueueFull(capacity) => AppError::QueueFull(capacity),
            other @ (JobError::Panicked(_) | JobError::ShuttingDown) => {
                AppError::Internal(other.into())
            }
        }
    }
}

/// Malformed or mistyped JSON bodies are client errors like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PlatformError> for AppError {
    fn from(e: PlatformError) -> Self {
        AppError::Printers(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::QueueFull(capacity) => {
                tracing::warn!("Print queue full at {capacity} jobs");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "QUEUE_FULL",
                    "Print queue is full, try again later".to_string(),
                    None,
                )
            }
            AppError::Load(reason) => {
                tracing::error!("Load error: {reason}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LOAD_ERROR",
                    "Error printing".to_string(),
                    Some(format!("Error loading content: {reason}")),
                )
            }
            AppError::Print(reason) => {
                tracing::error!("Print error: {reason}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PRINT_ERROR",
                    "Error printing".to_string(),
                    Some(reason.clone()),
                )
            }
            AppError::Printers(reason) => {
                tracing::error!("Printer listing error: {reason}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PRINTERS_ERROR",
                    "Error getting printers".to_string(),
                    Some(reason.clone()),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::executor::PrintError;
    use serde_json::Value;

    async fn parts(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let (status, body) = parts(AppError::Validation("No content provided".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "No content provided");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_print_error_keeps_platform_reason() {
        let err: AppError = JobError::Print(PrintError::Platform("paper out".into())).into();
        let (status, body) = parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "PRINT_ERROR");
        assert_eq!(body["details"], "paper out");
    }

    #[tokio::test]
    async fn test_queue_full_is_503() {
        let err: AppError = JobError::QueueFull(8).into();
        let (status, body) = parts(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "QUEUE_FULL");
    }

    #[tokio::test]
    async fn test_load_error_details() {
        let err: AppError = JobError::Load("navigation failed".into()).into();
        let (_, body) = parts(err).await;
        assert_eq!(body["code"], "LOAD_ERROR");
        assert_eq!(body["details"], "Error loading content: navigation failed");
    }

    #[tokio::test]
    async fn test_platform_error_maps_to_printers_error() {
        let err: AppError = PlatformError::Rejected("cups down".into()).into();
        let (status, body) = parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "PRINTERS_ERROR");
        assert_eq!(body["details"], "cups down");
    }

    #[tokio::test]
    async fn test_panicked_job_is_internal() {
        let err: AppError = JobError::Panicked("boom".into()).into();
        let (status, body) = parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_shutting_down_is_internal() {
        let err: AppError = JobError::ShuttingDown.into();
        let (_, body) = parts(err).await;
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
