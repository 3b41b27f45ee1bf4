//! Print Job Queue — serializes every print onto the one shared render surface.
//!
//! # Architecture
//! - [`PrintService`] is the handle the HTTP layer holds. `submit` only pushes
//!   onto an mpsc channel and returns the job's [`JobHandle`] immediately.
//! - A single worker task owns the [`SurfaceManager`] and drains the channel
//!   one job at a time: load → measure → print → resolve.
//! - Since only the worker can reach the surface, at most one job is ever
//!   bound to it and jobs run in submission order. A failed job is resolved
//!   with its error and the worker moves straight on to the next one. A
//!   panicking job is caught and resolved the same way, and its surface is
//!   discarded.
//!
//! `busy` and `pending` are atomics for reporting only; nothing synchronizes
//! on them.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use crate::platform::{PrintOptions, PrintPlatform};
use crate::printing::executor::{PrintError, PrintExecutor};
use crate::printing::job::{JobError, JobHandle, JobReceipt, JobResult, PrintJob};
use crate::render::{estimate_height, SurfaceManager};

/// Queue tuning taken from the service configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueOptions {
    /// Maximum pending jobs; `None` is unbounded.
    pub capacity: Option<usize>,
    /// Limit on a single platform print call; `None` waits forever.
    pub print_timeout: Option<Duration>,
}

/// Snapshot of the queue for `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub busy: bool,
}

#[derive(Default)]
struct QueueCounters {
    pending: AtomicUsize,
    busy: AtomicBool,
}

struct QueuedJob {
    job: PrintJob,
    reply: oneshot::Sender<JobResult>,
}

// ────────────────────────────────────────────────────────────────────────────
// Service handle
// ────────────────────────────────────────────────────────────────────────────

pub struct PrintService {
    /// `None` once shutdown has begun.
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<QueueCounters>,
    capacity: Option<usize>,
}

impl PrintService {
    /// Spawns the queue worker. The worker pre-creates the render surface
    /// before taking its first job.
    pub fn start(platform: Arc<dyn PrintPlatform>, options: QueueOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());

        let worker = QueueWorker {
            surfaces: SurfaceManager::new(platform),
            executor: PrintExecutor::new(options.print_timeout),
            counters: Arc::clone(&counters),
        };
        let handle = tokio::spawn(worker.run(rx));

        info!(
            capacity = ?options.capacity,
            print_timeout = ?options.print_timeout,
            "print queue started"
        );

        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            counters,
            capacity: options.capacity,
        }
    }

    /// Enqueues `job` and returns its completion handle without waiting.
    pub fn submit(&self, job: PrintJob) -> Result<JobHandle, JobError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(JobError::ShuttingDown)?;

        if let Some(capacity) = self.capacity {
            if self.counters.pending.load(Ordering::SeqCst) >= capacity {
                warn!(job_id = %job.id, capacity, "print queue full, rejecting job");
                return Err(JobError::QueueFull(capacity));
            }
        }

        let (reply, rx) = oneshot::channel();
        let handle = JobHandle::new(job.id, rx);
        let job_id = job.id;

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(QueuedJob { job, reply }).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(JobError::ShuttingDown);
        }

        debug!(%job_id, "job enqueued");
        Ok(handle)
    }

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.counters.pending.load(Ordering::SeqCst),
            busy: self.counters.busy.load(Ordering::SeqCst),
        }
    }

    /// Stops accepting jobs, lets the worker finish everything already
    /// queued, then waits for it to exit.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "print worker terminated abnormally");
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker
// ────────────────────────────────────────────────────────────────────────────

struct QueueWorker {
    surfaces: SurfaceManager,
    executor: PrintExecutor,
    counters: Arc<QueueCounters>,
}

impl QueueWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<QueuedJob>) {
        self.surfaces.warm_up().await;

        while let Some(QueuedJob { job, reply }) = rx.recv().await {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            self.counters.busy.store(true, Ordering::SeqCst);

            let waited = Utc::now().signed_duration_since(job.submitted_at);
            debug!(job_id = %job.id, waited_ms = waited.num_milliseconds(), "job dequeued");

            let span = tracing::info_span!("print_job", job_id = %job.id);
            let outcome = AssertUnwindSafe(self.process(&job).instrument(span))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    // The surface may be mid-load or mid-print.
                    self.surfaces.discard();
                    Err(JobError::Panicked(panic_message(panic.as_ref())))
                }
            };

            match &result {
                Ok(receipt) => info!(
                    job_id = %job.id,
                    printer = ?receipt.printer,
                    copies = receipt.copies,
                    page_mm = receipt.page.height_mm(),
                    surface = self.surfaces.generation(),
                    "print job completed"
                ),
                Err(e) => error!(job_id = %job.id, error = %e, "print job failed"),
            }

            if reply.send(result).is_err() {
                debug!(job_id = %job.id, "caller stopped waiting for job result");
            }
            self.counters.busy.store(false, Ordering::SeqCst);
        }

        info!("print queue drained, worker stopped");
    }

    /// Runs one job against the surface. Every expected failure ends up in
    /// the returned error.
    async fn process(&mut self, job: &PrintJob) -> JobResult {
        debug!(kind = job.document.kind(), "loading document");
        self.surfaces
            .load_document(&job.document)
            .await
            .map_err(|e| JobError::Load(e.to_string()))?;

        let surface = self
            .surfaces
            .get_surface()
            .await
            .map_err(|e| JobError::Load(e.to_string()))?;
        let page = estimate_height(surface)
            .await
            .map_err(|e| JobError::Load(e.to_string()))?;

        let options = PrintOptions {
            printer: job.printer.clone(),
            copies: job.copies,
            silent: job.silent,
            page,
            title: job.title(),
        };
        debug!(page_mm = page.height_mm(), "printing");

        if let Err(e) = self.executor.execute(surface, &options).await {
            if matches!(e, PrintError::TimedOut(_)) {
                // A hung call leaves the surface in an unknown state.
                self.surfaces.discard();
            }
            return Err(e.into());
        }

        Ok(JobReceipt {
            job_id: job.id,
            printer: job.printer.clone(),
            copies: job.copies,
            page,
            completed_at: Utc::now(),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{FakePlatform, FAKE_LINE_HEIGHT_PX};
    use crate::render::height::page_length_microns;
    use crate::render::Document;

    fn thermal_job(label: &str) -> PrintJob {
        PrintJob::new(
            Document::Thermal(format!("{label}\nline\n")),
            Some("Front".to_string()),
            1,
            true,
        )
    }

    fn start(platform: &FakePlatform, options: QueueOptions) -> PrintService {
        PrintService::start(Arc::new(platform.clone()), options)
    }

    // ── ordering and isolation ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_failed_job_does_not_block_queue() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let first = service.submit(thermal_job("job-1")).unwrap();
        let second = service.submit(thermal_job("FAIL_PRINT job-2")).unwrap();
        let third = service.submit(thermal_job("job-3")).unwrap();

        assert!(first.wait().await.is_ok());
        let err = second.wait().await.unwrap_err();
        assert!(matches!(err, JobError::Print(PrintError::Platform(ref r)) if r == "printer offline"));
        assert!(third.wait().await.is_ok());

        assert_eq!(
            platform.events(),
            vec![
                "load:job-1",
                "print:job-1",
                "load:FAIL_PRINT job-2",
                "print:FAIL_PRINT job-2",
                "load:job-3",
                "print:job-3",
            ]
        );
    }

    #[tokio::test]
    async fn test_load_error_rejects_job_and_keeps_surface() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let bad = service.submit(thermal_job("FAIL_LOAD")).unwrap();
        let good = service.submit(thermal_job("after")).unwrap();

        assert!(matches!(bad.wait().await, Err(JobError::Load(_))));
        assert!(good.wait().await.is_ok());
        assert_eq!(platform.surfaces_created(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fifty_concurrent_jobs_single_flight() {
        let platform = FakePlatform::new();
        platform.set_load_delay(Duration::from_millis(1));
        let service = Arc::new(start(&platform, QueueOptions::default()));

        let mut tasks = Vec::new();
        for i in 0..50 {
            let service = Arc::clone(&service);
            tasks.push(tokio::spawn(async move {
                let handle = service.submit(thermal_job(&format!("job-{i}"))).unwrap();
                handle.wait().await
            }));
        }

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(platform.max_active_loads(), 1);
        assert_eq!(platform.printed().len(), 50);
        assert_eq!(platform.surfaces_created(), 1);
    }

    #[tokio::test]
    async fn test_jobs_print_in_submission_order() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let handles: Vec<_> = (0..10)
            .map(|i| service.submit(thermal_job(&format!("job-{i}"))).unwrap())
            .collect();
        for handle in handles {
            handle.wait().await.unwrap();
        }

        let printed: Vec<String> = platform
            .printed()
            .into_iter()
            .map(|(doc, _)| doc.lines().next().unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("job-{i}")).collect();
        assert_eq!(printed, expected);
    }

    // ── page sizing and options ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_receipt_carries_measured_page() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let lines = "x\n".repeat(300);
        let job = PrintJob::new(Document::Thermal(lines), None, 3, false);
        let receipt = service.submit(job).unwrap().wait().await.unwrap();

        assert_eq!(
            receipt.page.height_microns,
            page_length_microns(300 * FAKE_LINE_HEIGHT_PX)
        );
        assert_eq!(receipt.copies, 3);
        assert_eq!(receipt.printer, None);

        let (_, options) = &platform.printed()[0];
        assert_eq!(options.page, receipt.page);
        assert!(!options.silent);
    }

    // ── surface recovery ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_crashed_surface_recreated_for_next_job() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let crash = service.submit(thermal_job("CRASH")).unwrap();
        let next = service.submit(thermal_job("next")).unwrap();

        assert!(crash.wait().await.is_err());
        assert!(next.wait().await.is_ok());
        assert_eq!(platform.surfaces_created(), 2);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let bad = service.submit(thermal_job("PANIC")).unwrap();
        let next = service.submit(thermal_job("next")).unwrap();

        match bad.wait().await {
            Err(JobError::Panicked(reason)) => assert_eq!(reason, "render backend panicked"),
            other => panic!("expected a panicked job, got {other:?}"),
        }
        assert!(next.wait().await.is_ok());
        assert_eq!(platform.surfaces_created(), 2, "panicked surface replaced");

        let late = service.submit(thermal_job("late")).unwrap();
        assert!(late.wait().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_print_times_out_and_queue_continues() {
        let platform = FakePlatform::new();
        let service = start(
            &platform,
            QueueOptions {
                capacity: None,
                print_timeout: Some(Duration::from_secs(10)),
            },
        );

        let hung = service.submit(thermal_job("HANG")).unwrap();
        let next = service.submit(thermal_job("next")).unwrap();

        assert!(matches!(
            hung.wait().await,
            Err(JobError::Print(PrintError::TimedOut(_)))
        ));
        assert!(next.wait().await.is_ok());
        assert_eq!(platform.surfaces_created(), 2);
    }

    // ── capacity, status and shutdown ───────────────────────────────────────

    #[tokio::test]
    async fn test_bounded_queue_rejects_when_full() {
        let platform = FakePlatform::new();
        let service = start(
            &platform,
            QueueOptions {
                capacity: Some(2),
                print_timeout: None,
            },
        );

        // The worker has not run yet on this single-threaded runtime.
        let a = service.submit(thermal_job("a")).unwrap();
        let b = service.submit(thermal_job("b")).unwrap();
        assert!(matches!(
            service.submit(thermal_job("c")),
            Err(JobError::QueueFull(2))
        ));
        assert_eq!(service.status().pending, 2);

        a.wait().await.unwrap();
        b.wait().await.unwrap();
        assert!(service.submit(thermal_job("d")).is_ok());
    }

    #[tokio::test]
    async fn test_status_idle_after_drain() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        service.submit(thermal_job("a")).unwrap().wait().await.unwrap();
        service.shutdown().await;

        assert_eq!(
            service.status(),
            QueueStatus {
                pending: 0,
                busy: false
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_jobs() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());

        let handles: Vec<_> = (0..3)
            .map(|i| service.submit(thermal_job(&format!("job-{i}"))).unwrap())
            .collect();
        service.shutdown().await;

        for handle in handles {
            assert!(handle.wait().await.is_ok());
        }
        assert_eq!(platform.printed().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_rejected() {
        let platform = FakePlatform::new();
        let service = start(&platform, QueueOptions::default());
        service.shutdown().await;

        assert!(matches!(
            service.submit(thermal_job("late")),
            Err(JobError::ShuttingDown)
        ));
    }
}
