//! sftpx core library — config record, domain types, remote path mapping.
//!
//! - [`config`] — [`Config`] load / normalise / validate
//! - [`types`] — [`WatchEvent`] and [`Job`]
//! - [`remote_path`] — local → POSIX remote path normalisation
//! - [`error`] — [`ConfigError`], [`PathError`]

pub mod config;
pub mod error;
pub mod remote_path;
pub mod types;

pub use config::{Config, Credentials, SftpConfig};
pub use error::{ConfigError, PathError};
pub use types::{EventKind, Job, WatchEvent};
