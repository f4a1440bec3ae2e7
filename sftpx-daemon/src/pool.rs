//! Bounded upload worker pool for one session.
//!
//! `worker_count` tasks share the receiving end of one job queue. Each job is
//! delivered to exactly one worker, which runs the upload on the blocking pool
//! and logs the outcome. Dropping the [`JobSender`] closes the queue; workers
//! drain what is left and exit. [`WorkerPool::finish`] is the completion
//! barrier.

use std::ops::AddAssign;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use sftpx_core::Job;
use sftpx_remote::RemoteConnection;

use crate::error::UploadError;
use crate::upload::{UploadExecutor, UploadReceipt};

/// A full queue blocks the producer; that is the only backpressure.
const QUEUE_CAPACITY: usize = 1;

pub type JobSender = mpsc::Sender<Job>;
type SharedReceiver = Arc<Mutex<mpsc::Receiver<Job>>>;

/// What happened to one job. Logged, never persisted.
#[derive(Debug)]
pub struct UploadOutcome {
    pub job: Job,
    pub result: Result<UploadReceipt, UploadError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolTally {
    fn record(&mut self, outcome: &UploadOutcome) {
        if outcome.result.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AddAssign for PoolTally {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.failed += rhs.failed;
    }
}

pub struct WorkerPool {
    workers: Vec<JoinHandle<PoolTally>>,
}

impl WorkerPool {
    /// Start `worker_count` workers (at least one) uploading over `conn`.
    ///
    /// Returns the pool and the only sender of its queue.
    pub fn spawn<C: RemoteConnection>(
        worker_count: usize,
        conn: Arc<C>,
        executor: Arc<UploadExecutor>,
    ) -> (Self, JobSender) {
        let (tx, rx) = mpsc::channel::<Job>(QUEUE_CAPACITY);
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count.max(1))
            .map(|worker_id| {
                tokio::spawn(upload_worker(
                    worker_id,
                    rx.clone(),
                    conn.clone(),
                    executor.clone(),
                ))
            })
            .collect();

        (Self { workers }, tx)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to drain the queue and exit.
    ///
    /// Only returns once the sender has been dropped.
    pub async fn finish(self) -> PoolTally {
        let mut total = PoolTally::default();
        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            match handle.await {
                Ok(tally) => total += tally,
                Err(err) => {
                    tracing::error!(worker = worker_id, error = %err, "upload worker panicked");
                }
            }
        }
        total
    }
}

async fn upload_worker<C: RemoteConnection>(
    worker_id: usize,
    rx: SharedReceiver,
    conn: Arc<C>,
    executor: Arc<UploadExecutor>,
) -> PoolTally {
    let mut tally = PoolTally::default();

    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };

        let outcome = run_job(conn.clone(), executor.clone(), job).await;
        log_outcome(worker_id, &outcome);
        tally.record(&outcome);
    }

    tracing::debug!(
        worker = worker_id,
        succeeded = tally.succeeded,
        failed = tally.failed,
        "upload worker finished",
    );
    tally
}

async fn run_job<C: RemoteConnection>(
    conn: Arc<C>,
    executor: Arc<UploadExecutor>,
    job: Job,
) -> UploadOutcome {
    let task_job = job.clone();
    let result = tokio::task::spawn_blocking(move || executor.upload(conn.as_ref(), &task_job))
        .await
        .unwrap_or_else(|err| Err(UploadError::Join(err.to_string())));
    UploadOutcome { job, result }
}

fn log_outcome(worker_id: usize, outcome: &UploadOutcome) {
    let local = outcome.job.local_path.display();
    match &outcome.result {
        Ok(receipt) => tracing::info!(
            worker = worker_id,
            local = %local,
            remote = %receipt.remote_path,
            bytes = receipt.bytes,
            "upload complete",
        ),
        Err(err) => tracing::error!(
            worker = worker_id,
            local = %local,
            error = %err,
            "upload failed",
        ),
    }
}
