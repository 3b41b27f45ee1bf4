//! Print jobs and their single-shot completion handles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::printing::executor::PrintError;
use crate::render::{Document, PageSize};

/// Why a job did not print.
#[derive(Debug, Error)]
pub enum JobError {
    /// The surface failed to load the composed document.
    #[error("Error loading content: {0}")]
    Load(String),

    /// The platform print call reported failure.
    #[error(transparent)]
    Print(#[from] PrintError),

    /// The job panicked inside the worker; the surface was discarded.
    #[error("print job aborted: {0}")]
    Panicked(String),

    #[error("print queue is full ({0} jobs pending)")]
    QueueFull(usize),

    #[error("print service is shutting down")]
    ShuttingDown,
}

/// A unit of print work.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: Uuid,
    pub document: Document,
    /// Resolved destination; `None` means the OS default printer.
    pub printer: Option<String>,
    pub copies: u32,
    pub silent: bool,
    pub submitted_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(document: Document, printer: Option<String>, copies: u32, silent: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            printer,
            copies: copies.max(1),
            silent,
            submitted_at: Utc::now(),
        }
    }

    /// Title shown in the OS print queue.
    pub fn title(&self) -> String {
        format!("ticket-{}", self.id.simple())
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: Uuid,
    pub printer: Option<String>,
    pub copies: u32,
    pub page: PageSize,
    pub completed_at: DateTime<Utc>,
}

pub type JobResult = Result<JobReceipt, JobError>;

/// Caller side of a job's completion. Resolves exactly once.
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    rx: oneshot::Receiver<JobResult>,
}

impl JobHandle {
    pub(crate) fn new(id: Uuid, rx: oneshot::Receiver<JobResult>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the job to finish printing.
    ///
    /// If the worker is gone before the job was processed the job counts as
    /// rejected with [`JobError::ShuttingDown`].
    pub async fn wait(self) -> JobResult {
        self.rx.await.unwrap_or(Err(JobError::ShuttingDown))
    }
}
