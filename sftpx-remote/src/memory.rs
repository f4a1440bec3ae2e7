//! In-process remote store.
//!
//! Backs `--dry-run` and the test suites. Behaves like a strict SFTP server:
//! creating a file whose parent directory is missing fails.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sftpx_core::remote_path::{dir_prefixes, parent_dir};

use crate::error::{io_err, RemoteError};
use crate::store::{RemoteConnection, RemoteStore, RemoteWriter};

#[derive(Debug, Default)]
struct MemoryState {
    directories: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    /// Every successful `create_file`, in call order.
    created: Vec<String>,
    bytes_written: u64,
    connect_attempts: usize,
    connects: usize,
    closes: usize,
    fail_connect: bool,
    fail_create: BTreeSet<String>,
    discard_content: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that tracks paths and byte counts but drops file content.
    pub fn discarding() -> Self {
        let store = Self::default();
        store.state().discard_content = true;
        store
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    /// Make every following `connect` fail.
    pub fn fail_connect(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    /// Make `create_file` fail for this exact remote path.
    pub fn fail_create(&self, path: impl Into<String>) {
        self.state().fail_create.insert(path.into());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.state().files.clone()
    }

    pub fn directories(&self) -> BTreeSet<String> {
        self.state().directories.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state().created.clone()
    }

    pub fn bytes_written(&self) -> u64 {
        self.state().bytes_written
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

impl RemoteStore for MemoryStore {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, RemoteError> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if state.fail_connect {
            return Err(RemoteError::Connect {
                addr: self.describe(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        state.connects += 1;
        Ok(MemoryConnection {
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        })
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), RemoteError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(RemoteError::Closed)
        } else {
            Ok(())
        }
    }
}

impl RemoteConnection for MemoryConnection {
    fn make_directories(&self, path: &str) -> Result<(), RemoteError> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        for prefix in dir_prefixes(path) {
            if state.files.contains_key(&prefix) {
                return Err(io_err(
                    "mkdir",
                    prefix,
                    io::Error::new(io::ErrorKind::AlreadyExists, "a file exists at this path"),
                ));
            }
            state.directories.insert(prefix);
        }
        Ok(())
    }

    fn create_file(&self, path: &str) -> Result<RemoteWriter, RemoteError> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        if state.fail_create.contains(path) {
            return Err(io_err(
                "create",
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }
        if let Some(parent) = parent_dir(path) {
            if !state.directories.contains(parent) {
                return Err(io_err(
                    "create",
                    path,
                    io::Error::new(io::ErrorKind::NotFound, "no such directory"),
                ));
            }
        }
        state.files.insert(path.to_string(), Vec::new());
        state.created.push(path.to_string());
        Ok(Box::new(MemoryWriter {
            state: self.state.clone(),
            path: path.to_string(),
        }))
    }

    fn close(&self) -> Result<(), RemoteError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            lock(&self.state).closes += 1;
        }
        Ok(())
    }
}

struct MemoryWriter {
    state: Arc<Mutex<MemoryState>>,
    path: String,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        state.bytes_written += buf.len() as u64;
        if !state.discard_content {
            state
                .files
                .entry(self.path.clone())
                .or_default()
                .extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
