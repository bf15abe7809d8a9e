mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calmirror_core::Settings;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calmirror")]
#[command(about = "Mirror an ICS feed into your calendar")]
struct Cli {
    /// Path to config.toml (defaults to ~/.config/calmirror/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every filtered event and applied mutation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a sync would change, without changing anything
    Plan,
    /// Run one sync
    Sync {
        /// Compute and print the plan only
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let options = settings.resolve()?;

    match cli.command {
        Commands::Plan => commands::plan::run(&settings, &options, cli.verbose).await,
        Commands::Sync { dry_run: true } => {
            commands::plan::run(&settings, &options, cli.verbose).await
        }
        Commands::Sync { dry_run: false } => {
            commands::sync::run(&settings, &options, cli.verbose).await
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
