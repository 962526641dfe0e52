//! Binary crate for the `citycast` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - The interactive terminal widget
//! - Interactive configuration
//! - Human-friendly output formatting

use std::{fs, sync::Mutex};

use anyhow::Context;
use citycast_core::Config;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    init_tracing(cmd.is_interactive())?;
    cmd.run().await
}

/// The widget owns the terminal, so it logs to a file; everything else logs to stderr.
fn init_tracing(interactive: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "citycast=info,citycast_core=info".into());

    if interactive {
        let path = Config::log_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}
