//! The remote store seam consumed by the upload pipeline.
//!
//! Both traits are blocking; async callers run them on the blocking pool.
//! A connection is shared by every worker of one session, so implementations
//! must tolerate concurrent calls from several threads.

use std::io::Write;

use sftpx_core::remote_path::dir_prefixes;

use crate::error::RemoteError;

/// Writable handle to a freshly created (truncated) remote file.
pub type RemoteWriter = Box<dyn Write + Send>;

/// Something that can open a connection to the remote side.
pub trait RemoteStore: Send + Sync + 'static {
    type Connection: RemoteConnection;

    /// Open one connection. Called once per session.
    fn connect(&self) -> Result<Self::Connection, RemoteError>;

    /// Short human-readable target, used in log lines.
    fn describe(&self) -> String;
}

/// An open connection to the remote side.
pub trait RemoteConnection: Send + Sync + 'static {
    /// Create `path` and every missing ancestor. Existing directories are not
    /// an error.
    fn make_directories(&self, path: &str) -> Result<(), RemoteError>;

    /// Create or truncate the file at `path` and return a writer for it.
    fn create_file(&self, path: &str) -> Result<RemoteWriter, RemoteError>;

    /// Release the connection. Calling it more than once is a no-op.
    fn close(&self) -> Result<(), RemoteError>;
}

/// Create `dir` one prefix at a time.
///
/// A `mkdir` that fails is accepted when `is_dir` then reports the directory
/// exists: servers answer "already exists" with a generic failure code, and a
/// parallel worker may have won the race. On error returns the prefix that
/// could not be created together with the `mkdir` error.
pub fn create_dir_all_with<E>(
    dir: &str,
    mut mkdir: impl FnMut(&str) -> Result<(), E>,
    mut is_dir: impl FnMut(&str) -> bool,
) -> Result<(), (String, E)> {
    if is_dir(dir) {
        return Ok(());
    }
    for prefix in dir_prefixes(dir) {
        if let Err(err) = mkdir(&prefix) {
            if !is_dir(&prefix) {
                return Err((prefix, err));
            }
        }
    }
    Ok(())
}
