//! Agent configuration: the JSON (or YAML) record read once at startup.
//!
//! Keys are camelCase to stay compatible with existing `config.json` files:
//!
//! ```json
//! {
//!   "watchDir": "/data/in",
//!   "remoteDir": "/remote/out",
//!   "logDir": "~/logs",
//!   "logFile": "sftpx.log",
//!   "delaySeconds": 5,
//!   "workers": 4,
//!   "sftp": { "host": "example.org", "port": 22, "user": "deploy", "privateKeyPath": "~/.ssh/id_ed25519" }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.json";
pub const DEFAULT_SFTP_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

// ---------------------------------------------------------------------------
// Config record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Local directory whose direct children are watched.
    pub watch_dir: PathBuf,
    /// Remote root every upload is placed under.
    pub remote_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Base log file name; a timestamp is inserted before the extension.
    /// Unset means log to stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(default)]
    pub delay_seconds: i64,
    /// Upload workers per session. Values below 1 behave as 1.
    #[serde(default = "default_workers")]
    pub workers: i64,
    /// Re-subscribe to every directory that appears under the watch root.
    #[serde(default)]
    pub watch_subdirectories: bool,
    /// Cap on sessions holding a connection at the same time. Unset is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<usize>,
    pub sftp: SftpConfig,
}

fn default_workers() -> i64 {
    1
}

impl Config {
    /// Load, normalise, and validate the config file at `path`.
    ///
    /// Files ending in `.yaml` / `.yml` are parsed as YAML; anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        let config: Config = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };

        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Expand `~/` prefixes and turn empty optional strings into `None`.
    ///
    /// Old config files write `"password": ""` for "not set".
    pub fn normalized(mut self) -> Self {
        self.watch_dir = expand_home(&self.watch_dir);
        self.log_dir = self
            .log_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| expand_home(&dir));
        self.log_file = self.log_file.filter(|file| !file.is_empty());
        self.sftp.password = self.sftp.password.filter(|p| !p.is_empty());
        self.sftp.passphrase = self.sftp.passphrase.filter(|p| !p.is_empty());
        self.sftp.private_key_path = self
            .sftp
            .private_key_path
            .filter(|key| !key.as_os_str().is_empty())
            .map(|key| expand_home(&key));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("watchDir", "must not be empty"));
        }
        if self.remote_dir.trim().is_empty() {
            return Err(ConfigError::invalid("remoteDir", "must not be empty"));
        }
        if self.delay_seconds < 0 {
            return Err(ConfigError::invalid(
                "delaySeconds",
                format!("must be >= 0, got {}", self.delay_seconds),
            ));
        }
        if self.max_sessions == Some(0) {
            return Err(ConfigError::invalid("maxSessions", "must be >= 1 when set"));
        }
        if self.sftp.host.trim().is_empty() {
            return Err(ConfigError::invalid("sftp.host", "must not be empty"));
        }
        if self.sftp.user.trim().is_empty() {
            return Err(ConfigError::invalid("sftp.user", "must not be empty"));
        }
        if self.sftp.credentials().is_none() {
            return Err(ConfigError::invalid(
                "sftp",
                "set either `password` or `privateKeyPath`",
            ));
        }
        Ok(())
    }

    /// Debounce delay applied before every session.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds.max(0) as u64)
    }

    /// Effective worker count; never below 1.
    pub fn worker_count(&self) -> usize {
        if self.workers < 1 {
            1
        } else {
            self.workers as usize
        }
    }
}

// ---------------------------------------------------------------------------
// SFTP connection settings
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_port() -> u16 {
    DEFAULT_SFTP_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl SftpConfig {
    /// `host:port`, as handed to the TCP resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// A configured private key wins over a password.
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(path) = &self.private_key_path {
            return Some(Credentials::PrivateKey {
                path: path.clone(),
                passphrase: self.passphrase.clone(),
            });
        }
        self.password.clone().map(Credentials::Password)
    }
}

// Secrets never reach the log sink.
impl fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// How the agent authenticates against the SSH server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
    Password(String),
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::PrivateKey { .. } => "private-key",
            Credentials::Password(_) => "password",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::PrivateKey { path, passphrase } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Credentials::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Expand a leading `~/` (or a bare `~`) to the user's home directory.
///
/// Paths are returned unchanged when no home directory can be determined.
pub fn expand_home(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = if text == "~" {
        ""
    } else if let Some(rest) = text.strip_prefix("~/") {
        rest
    } else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
