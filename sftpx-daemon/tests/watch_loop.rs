//! The watch loop against the platform notifier and an in-memory remote.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use sftpx_daemon::watcher::watch;
use sftpx_daemon::{Dispatcher, SessionScheduler, UploadExecutor, WatchOptions};
use sftpx_remote::MemoryStore;

async fn wait_for(store: &MemoryStore, path: &str) -> Option<Vec<u8>> {
    for _ in 0..100 {
        if let Some(content) = store.file(path) {
            if !content.is_empty() {
                return Some(content);
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    None
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn created_file_is_uploaded_and_nested_file_is_ignored() {
    let dir = TempDir::new().expect("tempdir");
    let root = fs::canonicalize(dir.path()).expect("canonical root");
    fs::create_dir(root.join("existing")).expect("mkdir");
    let store = MemoryStore::new();

    let scheduler = Arc::new(SessionScheduler::new(
        Arc::new(store.clone()),
        UploadExecutor::new(&root, "/drop"),
        Duration::from_millis(200),
        2,
    ));
    let dispatcher = Dispatcher::new(scheduler, None);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let options = WatchOptions {
        root: root.clone(),
        watch_subdirectories: false,
    };
    let handle = tokio::spawn(watch(options, dispatcher, shutdown_rx));
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::write(root.join("existing/nested.txt"), "nested").expect("write nested");
    fs::write(root.join("report.csv"), "a,b\n").expect("write");

    assert_eq!(
        wait_for(&store, "/drop/report.csv").await,
        Some(b"a,b\n".to_vec())
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(store.file("/drop/existing/nested.txt").is_none());

    shutdown_tx.send(()).expect("shutdown");
    handle.await.expect("join").expect("watcher");
}

fn start(
    root: &std::path::Path,
    store: &MemoryStore,
    delay: Duration,
    watch_subdirectories: bool,
) -> (
    broadcast::Sender<()>,
    tokio::task::JoinHandle<Result<(), sftpx_daemon::DaemonError>>,
) {
    let scheduler = Arc::new(SessionScheduler::new(
        Arc::new(store.clone()),
        UploadExecutor::new(root, "/drop"),
        delay,
        2,
    ));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let options = WatchOptions {
        root: root.to_path_buf(),
        watch_subdirectories,
    };
    let handle = tokio::spawn(watch(options, Dispatcher::new(scheduler, None), shutdown_rx));
    (shutdown_tx, handle)
}

fn times_created(store: &MemoryStore, path: &str) -> usize {
    store.created().iter().filter(|p| p.as_str() == path).count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn entries_moved_into_the_root_are_uploaded() {
    let dir = TempDir::new().expect("tempdir");
    let root = fs::canonicalize(dir.path()).expect("canonical root").join("in");
    let staging = root.with_file_name("staging");
    fs::create_dir(&root).expect("root");
    fs::create_dir_all(staging.join("batch/two")).expect("staging");
    fs::write(staging.join("staged.txt"), "staged").expect("write");
    fs::write(staging.join("batch/one.txt"), "one").expect("write");
    fs::write(staging.join("batch/two/three.txt"), "three").expect("write");
    let store = MemoryStore::new();

    let (shutdown_tx, handle) = start(&root, &store, Duration::from_millis(200), false);
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::rename(staging.join("staged.txt"), root.join("moved.txt")).expect("move file");
    fs::rename(staging.join("batch"), root.join("batch")).expect("move dir");

    assert_eq!(wait_for(&store, "/drop/moved.txt").await, Some(b"staged".to_vec()));
    assert_eq!(wait_for(&store, "/drop/batch/one.txt").await, Some(b"one".to_vec()));
    assert_eq!(
        wait_for(&store, "/drop/batch/two/three.txt").await,
        Some(b"three".to_vec())
    );
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(times_created(&store, "/drop/moved.txt"), 1);
    assert_eq!(times_created(&store, "/drop/batch/one.txt"), 1);

    shutdown_tx.send(()).expect("shutdown");
    handle.await.expect("join").expect("watcher");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_written_into_new_subdirectory_is_uploaded_once() {
    let dir = TempDir::new().expect("tempdir");
    let root = fs::canonicalize(dir.path()).expect("canonical root");
    let store = MemoryStore::new();

    let (shutdown_tx, handle) = start(&root, &store, Duration::from_millis(300), true);
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::create_dir(root.join("d")).expect("mkdir");
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(root.join("d/a.txt"), "a").expect("write during delay");

    assert_eq!(wait_for(&store, "/drop/d/a.txt").await, Some(b"a".to_vec()));
    tokio::time::sleep(Duration::from_millis(500)).await;

    fs::write(root.join("d/late.txt"), "late").expect("write after session");
    assert_eq!(wait_for(&store, "/drop/d/late.txt").await, Some(b"late".to_vec()));
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(times_created(&store, "/drop/d/a.txt"), 1, "{:?}", store.created());
    assert_eq!(times_created(&store, "/drop/d/late.txt"), 1, "{:?}", store.created());
    assert_eq!(store.connects(), 2, "one session for the directory, one for late.txt");

    shutdown_tx.send(()).expect("shutdown");
    handle.await.expect("join").expect("watcher");
}

#[tokio::test]
async fn missing_root_fails_setup() {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().join("absent");
    let scheduler = Arc::new(SessionScheduler::new(
        Arc::new(MemoryStore::new()),
        UploadExecutor::new(&root, "/drop"),
        Duration::ZERO,
        1,
    ));
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let options = WatchOptions {
        root,
        watch_subdirectories: false,
    };

    let err = watch(options, Dispatcher::new(scheduler, None), shutdown_rx)
        .await
        .unwrap_err();
    assert!(matches!(err, sftpx_daemon::DaemonError::WatchSetup { .. }));
}
