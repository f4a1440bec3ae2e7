pub mod check;
pub mod push;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use sftpx_core::Config;

/// Load and validate the config at `path`, naming the file on failure.
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("failed to load config {}", path.display()))
}
