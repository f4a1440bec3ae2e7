//! `sftpx run`: watch the configured directory until Ctrl-C.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use sftpx_daemon::start_blocking;

use super::load_config;

/// Arguments for `sftpx run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Upload into an in-memory store instead of the SFTP server.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        start_blocking(config, self.dry_run).context("sftpx exited with error")
    }
}
