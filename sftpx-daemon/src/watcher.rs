//! Event source: entries created in (or moved into) the watch root become
//! sessions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use walkdir::WalkDir;

use sftpx_core::WatchEvent;
use sftpx_remote::RemoteStore;

use crate::dispatch::Dispatcher;
use crate::error::DaemonError;
use crate::pending::PendingDirs;

type SharedWatcher = Arc<Mutex<RecommendedWatcher>>;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Watch root; expected to be canonical so event paths compare equal.
    pub root: PathBuf,
    /// Also subscribe to directories that appear under the root.
    pub watch_subdirectories: bool,
}

/// Watch `options.root` until `shutdown_rx` fires.
///
/// Setup failures are returned as [`DaemonError::WatchSetup`]. Afterwards
/// errors from the notifier and failed stats are logged and skipped; the loop
/// only fails if the event channel closes.
pub async fn watch<S: RemoteStore>(
    options: WatchOptions,
    dispatcher: Dispatcher<S>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let root = options.root.clone();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })
    .map_err(|source| DaemonError::WatchSetup {
        path: root.clone(),
        source,
    })?;
    watcher
        .watch(&root, RecursiveMode::NonRecursive)
        .map_err(|source| DaemonError::WatchSetup {
            path: root.clone(),
            source,
        })?;
    let watcher: SharedWatcher = Arc::new(Mutex::new(watcher));
    let pending = PendingDirs::new();

    tracing::info!(
        root = %root.display(),
        subdirectories = options.watch_subdirectories,
        "watching for new files",
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else {
                    return Err(DaemonError::WatchChannelClosed);
                };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher error");
                        continue;
                    }
                };

                for path in created_paths(&event) {
                    if !accepts(&options, path) {
                        continue;
                    }
                    handle_created(&options, &dispatcher, &watcher, &pending, path.clone()).await;
                }
            }
        }
    }

    tracing::info!(root = %root.display(), "watcher stopped");
    Ok(())
}

/// Paths that newly exist according to `event`.
///
/// A move into a watched directory counts as a creation. inotify reports a
/// rename between two watched paths as `To` and then `Both`; only `To` is
/// taken so the move yields one session. FSEvents only reports `Any`, for the
/// source and the destination alike; the vanished source fails its stat.
fn created_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        | EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event.paths.as_slice(),
        _ => &[],
    }
}

async fn handle_created<S: RemoteStore>(
    options: &WatchOptions,
    dispatcher: &Dispatcher<S>,
    watcher: &SharedWatcher,
    pending: &PendingDirs,
    path: PathBuf,
) {
    let stat_path = path.clone();
    let event = match tokio::task::spawn_blocking(move || WatchEvent::classify(&stat_path)).await
    {
        Ok(Ok(event)) => event,
        Ok(Err(err)) => {
            tracing::warn!(path = %path.display(), error = %err, "stat failed, dropping event");
            return;
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "stat task failed");
            return;
        }
    };

    if !options.watch_subdirectories {
        tracing::info!(path = %path.display(), kind = %event.kind(), "detected new entry");
        let _ = dispatcher.dispatch(event);
        return;
    }

    let covered = pending.covers(&path);
    match event {
        WatchEvent::Directory(dir) if covered => {
            tracing::debug!(path = %dir.display(), "inside a pending directory, subscribing only");
            let watcher = watcher.clone();
            tokio::task::spawn_blocking(move || subscribe_tree(&watcher, &dir));
        }
        WatchEvent::File(file) if covered => {
            tracing::debug!(path = %file.display(), "inside a pending directory, left to its walk");
        }
        WatchEvent::Directory(dir) => {
            tracing::info!(path = %dir.display(), kind = "directory", "detected new entry");
            let claim = pending.claim(&dir);
            let watcher = watcher.clone();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let subscribe_dir = dir.clone();
                if let Err(err) =
                    tokio::task::spawn_blocking(move || subscribe_tree(&watcher, &subscribe_dir))
                        .await
                {
                    tracing::error!(path = %dir.display(), error = %err, "subscribe task failed");
                }
                let _ = dispatcher.dispatch_claimed(WatchEvent::Directory(dir), Some(claim));
            });
        }
        event @ WatchEvent::File(_) => {
            tracing::info!(path = %path.display(), kind = %event.kind(), "detected new entry");
            let _ = dispatcher.dispatch(event);
        }
    }
}

/// Without subdirectory watching only direct children of the root count,
/// whatever the platform backend reports.
fn accepts(options: &WatchOptions, path: &Path) -> bool {
    if options.watch_subdirectories {
        path.starts_with(&options.root) && path != options.root.as_path()
    } else {
        path.parent() == Some(options.root.as_path())
    }
}

/// Subscribe to `dir` and every directory beneath it. Failures are logged.
fn subscribe_tree(watcher: &SharedWatcher, dir: &Path) {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "cannot walk new directory");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let result = watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watch(entry.path(), RecursiveMode::NonRecursive);
        match result {
            Ok(()) => tracing::debug!(path = %entry.path().display(), "watching subdirectory"),
            Err(err) => tracing::warn!(
                path = %entry.path().display(),
                error = %err,
                "cannot watch subdirectory",
            ),
        }
    }
}
