//! sftpx: push files dropped into a local directory to an SFTP server.
//!
//! # Usage
//!
//! ```text
//! sftpx [--config configs/config.json] run [--dry-run]
//! sftpx [--config configs/config.json] check [--json]
//! sftpx [--config configs/config.json] push <PATH> [--dry-run]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, push::PushArgs, run::RunArgs};
use sftpx_core::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "sftpx",
    version,
    about = "Watch a directory and upload new files over SFTP",
    long_about = None,
)]
struct Cli {
    /// Path to the JSON (or YAML) config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the configured directory until Ctrl-C.
    Run(RunArgs),

    /// Load and validate the config, then print a summary.
    Check(CheckArgs),

    /// Upload one file or directory under the watch root right now.
    Push(PushArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(&cli.config),
        Commands::Check(args) => args.run(&cli.config),
        Commands::Push(args) => args.run(&cli.config),
    }
}
