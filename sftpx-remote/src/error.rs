//! Error types for sftpx-remote.

use thiserror::Error;

/// Everything a remote store can report: connection setup and per-operation I/O.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("authentication failed for user {user}: {source}")]
    Auth {
        user: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("server rejected credentials for user {user}")]
    AuthRejected { user: String },

    #[error("no credentials configured for user {user}")]
    NoCredentials { user: String },

    /// An SFTP request failed; `op` names the request (`mkdir`, `create`, ...).
    #[error("sftp {op} {path}: {source}")]
    Sftp {
        op: &'static str,
        path: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection already closed")]
    Closed,
}

pub(crate) fn sftp_err(op: &'static str, path: impl Into<String>, source: ssh2::Error) -> RemoteError {
    RemoteError::Sftp {
        op,
        path: path.into(),
        source,
    }
}

pub(crate) fn io_err(op: &'static str, path: impl Into<String>, source: std::io::Error) -> RemoteError {
    RemoteError::Io {
        op,
        path: path.into(),
        source,
    }
}
