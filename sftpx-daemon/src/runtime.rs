use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use sftpx_core::{Config, WatchEvent};
use sftpx_remote::{MemoryStore, RemoteStore, SftpStore};

use crate::dispatch::Dispatcher;
use crate::error::{io_err, DaemonError};
use crate::logging;
use crate::session::{SessionReport, SessionScheduler};
use crate::watcher::{self, WatchOptions};

/// Set up logging, build the runtime, and watch until Ctrl-C or a fatal error.
///
/// `dry_run` swaps the SFTP store for an in-memory one that only counts bytes.
pub fn start_blocking(config: Config, dry_run: bool) -> Result<(), DaemonError> {
    logging::init(&config)?;
    let runtime = build_runtime()?;

    if dry_run {
        tracing::warn!("dry run: uploads go to an in-memory store");
        runtime.block_on(run(config, MemoryStore::discarding()))
    } else {
        let store = SftpStore::new(config.sftp.clone());
        runtime.block_on(run(config, store))
    }
}

/// Run the agent against `store`.
pub async fn run<S: RemoteStore>(config: Config, store: S) -> Result<(), DaemonError> {
    let root = resolve_watch_root(&config.watch_dir)?;
    tracing::info!(
        root = %root.display(),
        remote = %config.remote_dir,
        target = %store.describe(),
        delay_s = config.delay().as_secs(),
        workers = config.worker_count(),
        max_sessions = ?config.max_sessions,
        "starting sftpx",
    );

    let scheduler = Arc::new(SessionScheduler::from_config(
        Arc::new(store),
        &config,
        root.clone(),
    ));
    let dispatcher = Dispatcher::new(scheduler, config.max_sessions);
    let options = WatchOptions {
        root,
        watch_subdirectories: config.watch_subdirectories,
    };

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let result = watcher::watch(options, dispatcher, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    }
                }
            }
        })
    };

    let (watcher_result, signal_result) = tokio::join!(watcher_handle, signal_handle);
    handle_join("watcher", watcher_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Upload `path` right away as a single session, skipping the debounce delay.
pub fn push_blocking(
    config: Config,
    path: &Path,
    dry_run: bool,
) -> Result<SessionReport, DaemonError> {
    logging::init_stderr();
    let runtime = build_runtime()?;

    if dry_run {
        runtime.block_on(push(&config, MemoryStore::discarding(), path))
    } else {
        let store = SftpStore::new(config.sftp.clone());
        runtime.block_on(push(&config, store, path))
    }
}

pub async fn push<S: RemoteStore>(
    config: &Config,
    store: S,
    path: &Path,
) -> Result<SessionReport, DaemonError> {
    let root = resolve_watch_root(&config.watch_dir)?;
    let target = fs::canonicalize(path).map_err(|e| io_err(path, e))?;
    let event = WatchEvent::classify(&target).map_err(|e| io_err(&target, e))?;

    let scheduler =
        SessionScheduler::from_config(Arc::new(store), config, root).with_delay(Duration::ZERO);
    Ok(scheduler.run(event).await?)
}

/// Canonical watch root, so notifier paths and `strip_prefix` agree.
fn resolve_watch_root(watch_dir: &Path) -> Result<PathBuf, DaemonError> {
    let root = fs::canonicalize(watch_dir).map_err(|e| io_err(watch_dir, e))?;
    if !root.is_dir() {
        return Err(io_err(
            &root,
            std::io::Error::new(std::io::ErrorKind::Other, "watch root is not a directory"),
        ));
    }
    Ok(root)
}

fn build_runtime() -> Result<tokio::runtime::Runtime, DaemonError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_watch_root_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = resolve_watch_root(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, DaemonError::Io { .. }), "got: {err}");
    }

    #[test]
    fn file_as_watch_root_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("file");
        fs::write(&file, b"x").expect("write");
        assert!(resolve_watch_root(&file).is_err());
    }

    #[test]
    fn join_failure_names_the_task() {
        let err = handle_join("watcher", Ok(Err(DaemonError::WatchChannelClosed))).unwrap_err();
        assert!(matches!(err, DaemonError::WatchChannelClosed));
    }
}
