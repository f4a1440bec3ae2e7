//! `sftpx check`: validate the config and show what the agent would do.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sftpx_core::Config;

use super::load_config;

/// Arguments for `sftpx check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        if self.json {
            let summary = summary_json(&config);
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to render config JSON")?
            );
            return Ok(());
        }
        print_summary(config_path, &config);
        Ok(())
    }
}

/// Everything but secrets.
fn summary_json(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "watchDir": config.watch_dir.display().to_string(),
        "remoteDir": config.remote_dir,
        "target": config.sftp.address(),
        "user": config.sftp.user,
        "auth": config.sftp.credentials().map(|c| c.kind()),
        "delaySeconds": config.delay().as_secs(),
        "workers": config.worker_count(),
        "watchSubdirectories": config.watch_subdirectories,
        "maxSessions": config.max_sessions,
        "logFile": config.log_file,
    })
}

fn print_summary(config_path: &Path, config: &Config) {
    println!(
        "{} config {} is valid",
        "✓".green(),
        config_path.display().to_string().bold()
    );

    let watch_state = if config.watch_dir.is_dir() {
        "ok".green()
    } else {
        "missing".yellow()
    };
    println!(
        "  watch     {} ({watch_state})",
        config.watch_dir.display()
    );
    println!(
        "  remote    sftp://{}@{}{}",
        config.sftp.user,
        config.sftp.address(),
        config.remote_dir
    );
    println!(
        "  auth      {}",
        config
            .sftp
            .credentials()
            .map(|c| c.kind())
            .unwrap_or("none")
    );
    println!(
        "  sessions  delay {}s, {} worker(s), {}",
        config.delay().as_secs(),
        config.worker_count(),
        match config.max_sessions {
            Some(limit) => format!("at most {limit} at once"),
            None => "unbounded".to_string(),
        }
    );
    println!(
        "  subdirs   {}",
        if config.watch_subdirectories {
            "watched"
        } else {
            "ignored"
        }
    );
    match (&config.log_dir, &config.log_file) {
        (Some(dir), Some(file)) => println!("  log       {}/{file}", dir.display()),
        (None, Some(file)) => println!("  log       {file}"),
        _ => println!("  log       stderr"),
    }
}
