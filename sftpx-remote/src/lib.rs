//! # sftpx-remote
//!
//! The remote side of an upload: the [`RemoteStore`] / [`RemoteConnection`]
//! seam, an SFTP implementation over libssh2 ([`SftpStore`]), and an
//! in-process implementation for dry runs and tests ([`MemoryStore`]).

pub mod error;
pub mod memory;
pub mod sftp;
pub mod store;

pub use error::RemoteError;
pub use memory::{MemoryConnection, MemoryStore};
pub use sftp::{SftpConnection, SftpStore};
pub use store::{create_dir_all_with, RemoteConnection, RemoteStore, RemoteWriter};
