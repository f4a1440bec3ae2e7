//! Error types for sftpx-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read (not found, permission denied, etc.).
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error — includes line/column context from serde_json.
    #[error("failed to parse config at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error for `.yaml` / `.yml` config files.
    #[error("failed to parse config at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but a field holds an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures mapping a local path onto the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{path} is not inside watch root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} resolves outside the watch root")]
    EscapesRoot { path: PathBuf },

    /// The local path *is* the watch root; a file target needs a name.
    #[error("{path} has no path relative to the watch root")]
    EmptyRelative { path: PathBuf },

    #[error("{path} is not valid UTF-8 and has no remote name")]
    NonUtf8 { path: PathBuf },
}
