//! courtside CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;
mod wiring;

use args::{Cli, Commands, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    init_logging(log_level, cli.log_format)?;

    let global = commands::GlobalOpts {
        config_path: cli.config,
        memory_state: cli.memory_state,
    };

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, global).await,
        Commands::Watch(args) => commands::watch::execute(args, global).await,
        Commands::Schedule(args) => commands::schedule::execute(args, global).await,
        Commands::State(args) => commands::state::execute(args, global).await,
        Commands::Config(args) => commands::config::execute(args, global).await,
        Commands::Doctor(args) => commands::doctor::execute(args, global).await,
    }
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
