//! Directories whose session has not started walking yet.
//!
//! A directory session uploads everything present when its walk starts, so
//! events for paths beneath a pending directory are already covered and must
//! not start sessions of their own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct PendingDirs {
    dirs: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl PendingDirs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, usize>> {
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `dir` pending until the returned claim is dropped.
    pub fn claim(&self, dir: impl Into<PathBuf>) -> PendingClaim {
        let dir = dir.into();
        *self.lock().entry(dir.clone()).or_insert(0) += 1;
        PendingClaim {
            dirs: self.clone(),
            dir,
        }
    }

    /// Whether a strict ancestor of `path` is pending.
    pub fn covers(&self, path: &Path) -> bool {
        let dirs = self.lock();
        !dirs.is_empty() && path.ancestors().skip(1).any(|dir| dirs.contains_key(dir))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Held by a directory session until its walk starts.
#[derive(Debug)]
pub struct PendingClaim {
    dirs: PendingDirs,
    dir: PathBuf,
}

impl PendingClaim {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for PendingClaim {
    fn drop(&mut self) {
        let mut dirs = self.dirs.lock();
        if let Some(count) = dirs.get_mut(&self.dir) {
            *count -= 1;
            if *count == 0 {
                dirs.remove(&self.dir);
            }
        }
    }
}
