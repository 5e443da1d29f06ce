//! Managed executor for archive jobs.
//!
//! Full tasks are sent over a `flume` channel to a dispatcher task, which runs
//! each job on a [`JoinSet`]. Shutting down stops intake, marks queued but
//! unstarted jobs as failed, and gives running jobs a grace period before
//! they are abandoned.
//!
//! The only sender lives behind the intake lock. Shutdown takes it out under
//! that lock, so every job is either sent before the channel disconnects and
//! seen by the dispatcher, or rejected.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::archiver::Archiver;
use crate::error::TaskError;
use crate::task::store::TaskStore;
use crate::task::types::Task;

/// `None` once shutdown has closed the channel.
type Intake = Arc<Mutex<Option<flume::Sender<Task>>>>;

/// Submission side of the pool, held by the task service.
#[derive(Debug)]
pub struct ArchivePool<S> {
    archiver: Arc<Archiver<S>>,
    intake: Intake,
    shutdown: CancellationToken,
}

/// Owner side of the pool, used once at process shutdown.
#[derive(Debug)]
pub struct ArchivePoolHandle {
    intake: Intake,
    shutdown: CancellationToken,
    dispatcher: JoinHandle<JoinSet<()>>,
}

impl<S: TaskStore> ArchivePool<S> {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(archiver: Archiver<S>) -> (Self, ArchivePoolHandle) {
        let archiver = Arc::new(archiver);
        let (jobs_tx, jobs_rx) = flume::unbounded();
        let intake = Arc::new(Mutex::new(Some(jobs_tx)));
        let shutdown = CancellationToken::new();

        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&archiver),
            jobs_rx,
            shutdown.clone(),
        ));

        (
            Self {
                archiver,
                intake: Arc::clone(&intake),
                shutdown: shutdown.clone(),
            },
            ArchivePoolHandle {
                intake,
                shutdown,
                dispatcher,
            },
        )
    }

    /// `false` once shutdown has begun.
    pub fn is_accepting(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Mark `task` as `processing`, persist that, and queue it.
    ///
    /// Returns the persisted `processing` snapshot immediately; the archive is
    /// built in the background. Once shutdown has closed the intake the task
    /// is persisted as `error` instead and `ArchiverUnavailable` returned.
    pub async fn submit(&self, mut task: Task) -> Result<Task, TaskError> {
        // Held until the job is sent so shutdown cannot close the channel
        // between the `processing` update and the send.
        let intake = self.intake.lock().await;
        let Some(jobs_tx) = intake.as_ref() else {
            // The task is already full and can never be archived now.
            drop(intake);
            self.archiver.abandon(task).await;
            return Err(TaskError::ArchiverUnavailable);
        };

        task.mark_processing();
        let stored = self.archiver.store().update(task).await?;

        if let Err(flume::SendError(task)) = jobs_tx.send(stored.clone()) {
            drop(intake);
            self.archiver.abandon(task).await;
            return Err(TaskError::ArchiverUnavailable);
        }

        debug!(task_id = %stored.id, "archive job queued");
        Ok(stored)
    }
}

async fn dispatch<S: TaskStore>(
    archiver: Arc<Archiver<S>>,
    jobs_rx: flume::Receiver<Task>,
    shutdown: CancellationToken,
) -> JoinSet<()> {
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            job = jobs_rx.recv_async() => match job {
                Ok(task) => {
                    let archiver = Arc::clone(&archiver);
                    running.spawn(async move {
                        archiver.run(task).await;
                    });
                }
                Err(_) => break,
            },
            Some(finished) = running.join_next(), if !running.is_empty() => {
                if let Err(e) = finished {
                    warn!(error = %e, "archive job terminated abnormally");
                }
            }
        }
    }

    // Anything queued now never starts. Keep receiving until the intake is
    // closed so late sends are failed too instead of left in `processing`.
    while let Ok(task) = jobs_rx.recv_async().await {
        archiver.abandon(task).await;
    }

    running
}

impl ArchivePoolHandle {
    /// Stop accepting jobs and wait up to `grace` for running ones.
    ///
    /// Jobs still running after `grace` are aborted. Their blocking I/O
    /// cannot be interrupted and finishes detached, leaving the task in
    /// `processing` and possibly an orphaned temporary file.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.cancel();
        // Dropping the only sender disconnects the channel once it is empty.
        self.intake.lock().await.take();

        let mut running = match self.dispatcher.await {
            Ok(running) => running,
            Err(e) => {
                warn!(error = %e, "archive dispatcher terminated abnormally");
                return;
            }
        };

        let in_flight = running.len();
        if in_flight == 0 {
            return;
        }
        info!(in_flight, grace_secs = grace.as_secs_f64(), "waiting for archive jobs");

        let drained = tokio::time::timeout(grace, async {
            while let Some(finished) = running.join_next().await {
                if let Err(e) = finished {
                    warn!(error = %e, "archive job terminated abnormally");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = running.len(),
                "archive jobs did not finish within the grace period; abandoning"
            );
            running.abort_all();
        }
    }
}
