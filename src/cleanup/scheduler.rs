use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::evidence::ReleaseOutcome;

use super::error::CleanupError;
use super::types::{CleanupJob, CleanupPolicy, CleanupReport};

enum Command {
    Run(CleanupJob),
    Flush(oneshot::Sender<()>),
    Stop,
}

struct Inner {
    tx: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_initiated: AtomicBool,
    jobs_completed: Arc<AtomicUsize>,
}

/// Runs cleanup jobs inline or on a single background worker.
///
/// Cloning shares the worker. Call [`shutdown`](Self::shutdown) before the process
/// exits so queued jobs finish; jobs submitted afterwards run inline.
#[derive(Clone)]
pub struct CleanupScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CleanupScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScheduler")
            .field("shutdown_initiated", &self.is_shutdown_initiated())
            .field("jobs_completed", &self.jobs_completed())
            .finish()
    }
}

impl CleanupScheduler {
    /// Starts the background worker. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let jobs_completed = Arc::new(AtomicUsize::new(0));
        let completed = Arc::clone(&jobs_completed);

        let worker = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Run(job) => {
                        run_job(job).await;
                        completed.fetch_add(1, Ordering::AcqRel);
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                    // Later sends fail and fall back to inline; buffered jobs still drain.
                    Command::Stop => rx.close(),
                }
            }
            debug!("Cleanup worker stopped");
        });

        Self {
            inner: Arc::new(Inner {
                tx,
                worker: Mutex::new(Some(worker)),
                shutdown_initiated: AtomicBool::new(false),
                jobs_completed,
            }),
        }
    }

    /// Releases the job's handles now (`Immediate`) or queues them (`Deferred`).
    ///
    /// Returns the report when the job ran inline, `None` when it was queued.
    pub async fn submit(&self, job: CleanupJob, policy: CleanupPolicy) -> Option<CleanupReport> {
        if policy == CleanupPolicy::Deferred && !self.is_shutdown_initiated() {
            let Err(mpsc::error::SendError(command)) = self.inner.tx.send(Command::Run(job)) else {
                return None;
            };
            let Command::Run(job) = command else {
                return None;
            };
            warn!(invocation_id = %job.invocation_id, "Cleanup worker stopped, releasing inline");
            return Some(self.run_inline(job).await);
        }
        Some(self.run_inline(job).await)
    }

    /// Waits until every job queued before this call has finished.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.inner.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Drains queued jobs and stops the worker. Idempotent.
    pub async fn shutdown(&self) {
        if self.inner.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.inner.tx.send(Command::Stop);
        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Cleanup worker panicked");
            }
        }
        info!(
            jobs_completed = self.jobs_completed(),
            "Cleanup scheduler shut down"
        );
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.inner.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Jobs finished so far, inline and background.
    pub fn jobs_completed(&self) -> usize {
        self.inner.jobs_completed.load(Ordering::Acquire)
    }

    async fn run_inline(&self, job: CleanupJob) -> CleanupReport {
        let report = run_job(job).await;
        self.inner.jobs_completed.fetch_add(1, Ordering::AcqRel);
        report
    }
}

/// Releases every handle in order. Never fails; failures are counted and logged.
async fn run_job(job: CleanupJob) -> CleanupReport {
    let mut report = CleanupReport::default();

    for handle in &job.handles {
        match handle.release().await {
            Ok(ReleaseOutcome::Removed) => report.released += 1,
            Ok(_) => report.missing += 1,
            Err(source) => {
                report.failed += 1;
                let err = CleanupError::CleanupFailure {
                    handle: handle.to_string(),
                    source,
                };
                error!(invocation_id = %job.invocation_id, error = %err, "Cleanup failure");
            }
        }
    }

    debug!(
        invocation_id = %job.invocation_id,
        released = report.released,
        missing = report.missing,
        failed = report.failed,
        "Cleanup job finished"
    );
    report
}
