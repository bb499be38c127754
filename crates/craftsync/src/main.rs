//! CraftSync CLI - remote sync and snapshots for Minecraft servers
//!
//! This is the main entry point for the craftsync command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    // Run command
    match cli.command {
        Commands::Profile(args) => commands::profile::run(args, cli.server.as_deref()).await,
        Commands::Sync(args) => {
            commands::sync::run(args, cli.server.as_deref(), cli.config.as_deref()).await
        }
        Commands::Status(args) => {
            commands::status::run(args, cli.server.as_deref(), cli.config.as_deref()).await
        }
        Commands::Start(args) => {
            commands::start::run(args, cli.server.as_deref(), cli.config.as_deref()).await
        }
        Commands::Stop(args) => {
            commands::stop::run(args, cli.server.as_deref(), cli.config.as_deref()).await
        }
        Commands::Connect(args) => commands::connect::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref()).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
