//! Config command - configuration management

use anyhow::{Context, Result};
use std::fs;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::commands::GlobalOpts;
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs, global: GlobalOpts) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
        ConfigCommands::Show => show_config(global).await,
    }
}

async fn init_config(path: std::path::PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    let content = AppConfig::example_toml();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set source.identity and bluesky.identifier in the config file");
    println!("  2. Export RAPIDAPI_KEY and BLUESKY_APP_PASSWORD");
    println!("  3. Run 'courtside doctor' to validate your setup");
    println!("  4. Run 'courtside run --dry-run' to preview what would be posted");

    Ok(())
}

async fn show_config(global: GlobalOpts) -> Result<()> {
    let config = AppConfig::load(global.config_path.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}
