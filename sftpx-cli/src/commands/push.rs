//! `sftpx push`: one session for one path, no debounce.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sftpx_daemon::{push_blocking, SessionReport};

use super::load_config;

/// Arguments for `sftpx push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// File or directory under the watch root.
    pub path: PathBuf,

    /// Upload into an in-memory store instead of the SFTP server.
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let report = push_blocking(config, &self.path, self.dry_run)
            .with_context(|| format!("push failed for {}", self.path.display()))?;
        print_report(&report, self.dry_run);

        if report.failed > 0 {
            anyhow::bail!("{} of {} uploads failed", report.failed, report.enqueued);
        }
        Ok(())
    }
}

fn print_report(report: &SessionReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let mark = if report.failed == 0 {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{prefix}{mark} {} {} ({} enqueued, {} uploaded, {} failed) in {} ms",
        report.kind,
        report.path.display(),
        report.enqueued,
        report.succeeded,
        report.failed,
        report.elapsed.as_millis(),
    );
}
