use std::path::PathBuf;

use thiserror::Error;

use sftpx_core::{ConfigError, PathError};
use sftpx_remote::RemoteError;

/// Failures that stop the agent: startup problems and a dead watcher.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("watcher event channel closed")]
    WatchChannelClosed,

    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("{task} task join failure: {reason}")]
    Join { task: &'static str, reason: String },
}

/// Failures that end one session before any job is enqueued.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("{stage} task join failure: {reason}")]
    Join { stage: &'static str, reason: String },
}

/// Failures of a single upload job. Never abort the session.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("open local file {path}: {source}")]
    OpenLocal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("map remote path: {0}")]
    Path(#[from] PathError),

    #[error("create remote dir for {remote}: {source}")]
    MakeDirectories {
        remote: String,
        #[source]
        source: RemoteError,
    },

    #[error("create remote file {remote}: {source}")]
    CreateRemote {
        remote: String,
        #[source]
        source: RemoteError,
    },

    #[error("copy {local} to {remote}: {source}")]
    Copy {
        local: PathBuf,
        remote: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload task join failure: {0}")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
