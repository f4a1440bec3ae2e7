//! Domain types shared by the watcher, the session scheduler, and the pool.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// WatchEvent
// ---------------------------------------------------------------------------

/// A creation detected under the watch root, classified by a stat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    File(PathBuf),
    Directory(PathBuf),
}

impl WatchEvent {
    /// Stat `path` and tag it as a file or a directory.
    ///
    /// Symlinks are followed, matching what an upload of the path would read.
    pub fn classify(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        if meta.is_dir() {
            Ok(WatchEvent::Directory(path.to_path_buf()))
        } else {
            Ok(WatchEvent::File(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::File(path) | WatchEvent::Directory(path) => path,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            WatchEvent::File(_) => EventKind::File,
            WatchEvent::Directory(_) => EventKind::Directory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    File,
    Directory,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::File => "file",
            EventKind::Directory => "directory",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One local file waiting to be uploaded. Claimed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    pub local_path: PathBuf,
}

impl Job {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
        }
    }
}

impl From<PathBuf> for Job {
    fn from(local_path: PathBuf) -> Self {
        Self { local_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classify_tags_files_and_directories() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").expect("write");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");

        assert_eq!(WatchEvent::classify(&file).expect("file"), WatchEvent::File(file.clone()));
        assert_eq!(
            WatchEvent::classify(&sub).expect("dir"),
            WatchEvent::Directory(sub.clone())
        );
        assert_eq!(WatchEvent::Directory(sub).kind(), EventKind::Directory);
    }

    #[test]
    fn classify_missing_path_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = WatchEvent::classify(&dir.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
