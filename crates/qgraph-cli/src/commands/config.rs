//! Configuration management commands

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::settings::Settings;

const EXAMPLE_CONFIG: &str = include_str!("../../../../qgraph.toml.example");

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration (file, environment and defaults)
    Show,
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands, settings: &Settings) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(settings),
        ConfigCommands::Init { force } => init(Path::new("qgraph.toml"), force),
    }
}

fn show(settings: &Settings) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match &settings.source {
        Some(path) => println!("Config file: {}\n", path.display()),
        None => println!("No configuration file found. Using defaults.\n"),
    }

    println!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());

    Ok(())
}
