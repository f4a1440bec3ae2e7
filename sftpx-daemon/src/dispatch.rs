//! Fire-and-forget session dispatch, with an optional cap on sessions in flight.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use sftpx_core::WatchEvent;
use sftpx_remote::RemoteStore;

use crate::pending::PendingClaim;
use crate::session::SessionScheduler;

pub struct Dispatcher<S: RemoteStore> {
    scheduler: Arc<SessionScheduler<S>>,
    /// `None` means no limit.
    permits: Option<Arc<Semaphore>>,
}

impl<S: RemoteStore> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            permits: self.permits.clone(),
        }
    }
}

impl<S: RemoteStore> Dispatcher<S> {
    pub fn new(scheduler: Arc<SessionScheduler<S>>, max_sessions: Option<usize>) -> Self {
        Self {
            scheduler,
            permits: max_sessions.map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
        }
    }

    /// Spawn a session task for `event` and return immediately.
    ///
    /// With a session cap, the spawned task waits for a permit; the caller
    /// never does.
    pub fn dispatch(&self, event: WatchEvent) -> JoinHandle<()> {
        self.dispatch_claimed(event, None)
    }

    /// [`dispatch`](Self::dispatch) for a directory session holding `claim`.
    pub fn dispatch_claimed(
        &self,
        event: WatchEvent,
        claim: Option<PendingClaim>,
    ) -> JoinHandle<()> {
        let scheduler = self.scheduler.clone();
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };
            run_session(&scheduler, event, claim).await;
        })
    }
}

/// Run one session and log how it ended.
pub async fn run_session<S: RemoteStore>(
    scheduler: &SessionScheduler<S>,
    event: WatchEvent,
    claim: Option<PendingClaim>,
) {
    let path = event.path().to_path_buf();
    match scheduler.run_with_claim(event, claim).await {
        Ok(report) => tracing::info!(
            path = %report.path.display(),
            kind = %report.kind,
            enqueued = report.enqueued,
            succeeded = report.succeeded,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "session complete",
        ),
        Err(err) => tracing::error!(path = %path.display(), error = %err, "session aborted"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use sftpx_remote::MemoryStore;
    use tempfile::TempDir;

    use super::*;
    use crate::upload::UploadExecutor;

    #[tokio::test]
    async fn capped_dispatch_still_runs_every_session() {
        let root = TempDir::new().expect("root");
        let store = MemoryStore::new();
        let scheduler = Arc::new(SessionScheduler::new(
            Arc::new(store.clone()),
            UploadExecutor::new(root.path(), "/out"),
            Duration::ZERO,
            1,
        ));
        let dispatcher = Dispatcher::new(scheduler, Some(1));

        let mut handles = Vec::new();
        for i in 0..4 {
            let path = root.path().join(format!("f{i}.txt"));
            fs::write(&path, format!("{i}")).expect("write");
            handles.push(dispatcher.dispatch(WatchEvent::File(path)));
        }
        for handle in handles {
            handle.await.expect("session task");
        }

        assert_eq!(store.connects(), 4, "one connection per session");
        assert_eq!(store.closes(), 4);
        assert_eq!(store.files().len(), 4);
    }
}
