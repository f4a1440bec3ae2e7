//! One file transfer: local file → remote path on an open connection.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sftpx_core::{remote_path, Job};
use sftpx_remote::RemoteConnection;

use crate::error::UploadError;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub remote_path: String,
    pub bytes: u64,
}

/// Maps local paths under the watch root onto the remote root and copies them.
#[derive(Debug, Clone)]
pub struct UploadExecutor {
    watch_root: PathBuf,
    remote_root: String,
}

impl UploadExecutor {
    pub fn new(watch_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            watch_root: watch_root.into(),
            remote_root: remote_root.into(),
        }
    }

    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    pub fn remote_path_for(&self, local: &Path) -> Result<String, UploadError> {
        Ok(remote_path::remote_path_for(
            &self.watch_root,
            &self.remote_root,
            local,
        )?)
    }

    /// Upload one job over `conn`.
    ///
    /// Steps: open local → map path → mkdir parents → create remote → copy.
    /// Nothing is cleaned up on failure; the remote file may be partial.
    pub fn upload<C: RemoteConnection + ?Sized>(
        &self,
        conn: &C,
        job: &Job,
    ) -> Result<UploadReceipt, UploadError> {
        let local = &job.local_path;
        let mut src = File::open(local).map_err(|source| UploadError::OpenLocal {
            path: local.clone(),
            source,
        })?;

        let remote = self.remote_path_for(local)?;

        if let Some(dir) = remote_path::parent_dir(&remote) {
            conn.make_directories(dir)
                .map_err(|source| UploadError::MakeDirectories {
                    remote: remote.clone(),
                    source,
                })?;
        }

        let mut dst = conn
            .create_file(&remote)
            .map_err(|source| UploadError::CreateRemote {
                remote: remote.clone(),
                source,
            })?;

        let copy_err = |source| UploadError::Copy {
            local: local.clone(),
            remote: remote.clone(),
            source,
        };
        let bytes = io::copy(&mut src, &mut dst).map_err(copy_err)?;
        dst.flush().map_err(copy_err)?;

        Ok(UploadReceipt {
            remote_path: remote,
            bytes,
        })
    }
}
