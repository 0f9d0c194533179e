//! recsync CLI - inspect and edit synchronized record collections
//!
//! Every command runs a short-lived sync controller: load, apply the edit,
//! wait for the background save, exit. `watch` keeps one running.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_config;
use crate::commands::magazines::run_magazines;
use crate::commands::sessions::run_sessions;
use crate::commands::speakers::run_speakers;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.api_url, cli.data_dir)?;

    match cli.command {
        Commands::Magazines { command } => run_magazines(command, &config).await,
        Commands::Sessions { command } => run_sessions(command, &config).await,
        Commands::Speakers { command } => run_speakers(command, &config).await,
        Commands::Watch { collection } => run_watch(collection, &config).await,
    }
}
