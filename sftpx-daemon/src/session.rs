//! One session per watch event: wait, connect, enumerate, upload, disconnect.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use sftpx_core::{Config, EventKind, WatchEvent};
use sftpx_remote::{RemoteConnection, RemoteStore};

use crate::enumerate::enumerate;
use crate::error::SessionError;
use crate::pending::PendingClaim;
use crate::pool::WorkerPool;
use crate::upload::UploadExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub path: PathBuf,
    pub kind: EventKind,
    pub enqueued: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Time from connect to disconnect; excludes the debounce delay.
    pub elapsed: Duration,
}

pub struct SessionScheduler<S: RemoteStore> {
    store: Arc<S>,
    executor: Arc<UploadExecutor>,
    delay: Duration,
    worker_count: usize,
}

impl<S: RemoteStore> SessionScheduler<S> {
    pub fn new(
        store: Arc<S>,
        executor: UploadExecutor,
        delay: Duration,
        worker_count: usize,
    ) -> Self {
        Self {
            store,
            executor: Arc::new(executor),
            delay,
            worker_count: worker_count.max(1),
        }
    }

    /// Scheduler for `config`, with `watch_root` as the resolved watch directory.
    pub fn from_config(store: Arc<S>, config: &Config, watch_root: PathBuf) -> Self {
        Self::new(
            store,
            UploadExecutor::new(watch_root, config.remote_dir.clone()),
            config.delay(),
            config.worker_count(),
        )
    }

    /// Same scheduler with a different debounce delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Handle one event end to end.
    ///
    /// A connection failure ends the session before any job exists. Once
    /// connected, per-job failures are logged by the pool and only counted
    /// here; the connection is closed on every path out.
    pub async fn run(&self, event: WatchEvent) -> Result<SessionReport, SessionError> {
        self.run_with_claim(event, None).await
    }

    /// Like [`run`](Self::run), holding `claim` until the walk is about to
    /// start. Anything created under the claimed directory before then is
    /// picked up by the walk.
    pub async fn run_with_claim(
        &self,
        event: WatchEvent,
        claim: Option<PendingClaim>,
    ) -> Result<SessionReport, SessionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let started = Instant::now();
        let guard = self.connect().await?;

        let (pool, jobs) = WorkerPool::spawn(
            self.worker_count,
            guard.connection(),
            self.executor.clone(),
        );

        drop(claim);
        let walk_event = event.clone();
        let walked = tokio::task::spawn_blocking(move || {
            enumerate(&walk_event, |job| jobs.blocking_send(job).is_ok())
        })
        .await;
        let walked = match walked {
            Ok(count) => Some(count),
            Err(err) => {
                tracing::error!(
                    path = %event.path().display(),
                    error = %err,
                    "enumeration task failed",
                );
                None
            }
        };

        let tally = pool.finish().await;
        guard.close().await;

        Ok(SessionReport {
            path: event.path().to_path_buf(),
            kind: event.kind(),
            enqueued: walked.unwrap_or_else(|| tally.attempted()),
            succeeded: tally.succeeded,
            failed: tally.failed,
            elapsed: started.elapsed(),
        })
    }

    async fn connect(&self) -> Result<ConnectionGuard<S::Connection>, SessionError> {
        let store = self.store.clone();
        let conn = tokio::task::spawn_blocking(move || store.connect())
            .await
            .map_err(|err| SessionError::Join {
                stage: "connect",
                reason: err.to_string(),
            })?
            .map_err(|source| SessionError::Connect {
                target: self.store.describe(),
                source,
            })?;
        Ok(ConnectionGuard::new(conn))
    }
}

/// Owns the session's connection; closes it exactly once, even on unwind.
struct ConnectionGuard<C: RemoteConnection> {
    conn: Arc<C>,
    closed: bool,
}

impl<C: RemoteConnection> ConnectionGuard<C> {
    fn new(conn: C) -> Self {
        Self {
            conn: Arc::new(conn),
            closed: false,
        }
    }

    fn connection(&self) -> Arc<C> {
        self.conn.clone()
    }

    async fn close(mut self) {
        self.closed = true;
        let conn = self.conn.clone();
        match tokio::task::spawn_blocking(move || conn.close()).await {
            Ok(Ok(())) => tracing::debug!("remote connection closed"),
            Ok(Err(err)) => tracing::warn!(error = %err, "closing remote connection failed"),
            Err(err) => tracing::warn!(error = %err, "close task join failure"),
        }
    }
}

impl<C: RemoteConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.conn.close() {
            tracing::warn!(error = %err, "closing remote connection failed");
        }
    }
}
