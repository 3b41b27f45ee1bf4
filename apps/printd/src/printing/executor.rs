//! Print Executor — issues the platform print call for the bound surface.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::platform::{PrintOptions, RenderSurface};

const UNKNOWN_REASON: &str = "unknown print error";

#[derive(Debug, Error)]
pub enum PrintError {
    /// Failure reported by the platform, with its human-readable reason.
    #[error("{0}")]
    Platform(String),

    #[error("print call timed out after {0:?}")]
    TimedOut(Duration),
}

pub struct PrintExecutor {
    /// `None` waits for the platform indefinitely.
    timeout: Option<Duration>,
}

impl PrintExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Prints whatever is loaded on `surface`. The surface is left intact.
    pub async fn execute(
        &self,
        surface: &mut dyn RenderSurface,
        options: &PrintOptions,
    ) -> Result<(), PrintError> {
        let call = surface.print(options);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, printer = ?options.printer, "print call timed out");
                    return Err(PrintError::TimedOut(limit));
                }
            },
            None => call.await,
        };

        result.map_err(|e| PrintError::Platform(failure_reason(&e.to_string())))
    }
}

fn failure_reason(raw: &str) -> String {
    let reason = raw.trim();
    if reason.is_empty() {
        UNKNOWN_REASON.to_string()
    } else {
        reason.to_string()
    }
}
