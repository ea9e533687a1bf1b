//! qgraph CLI - train and inspect Q-learning graphs
//!
//! Graphs are read from TOML or JSON definition files. The `grid` command
//! runs a built-in grid world that learns offline and then keeps learning
//! while it plays.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unused_async)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod grid;
mod settings;

use commands::{config, grid as grid_cmd, train};
use settings::Settings;

#[derive(Parser)]
#[command(name = "qgraph")]
#[command(
    author,
    version,
    about = "qgraph - tabular Q-learning over state graphs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./qgraph.toml, then ~/.config/qgraph/qgraph.toml)
    #[arg(short, long, global = true, env = "QGRAPH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a graph loaded from a definition file and print its policy
    Train(train::TrainArgs),

    /// Learn and play the built-in grid world
    Grid(grid_cmd::GridArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn init_tracing(settings: &Settings, verbose: bool) {
    let level = if verbose { "debug" } else { settings.log.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("qgraph_cli={level},qgraph_rl={level},qgraph_core={level}").into()
    });

    let json = settings.log.format.eq_ignore_ascii_case("json");
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    init_tracing(&settings, cli.verbose);
    match &settings.source {
        Some(path) => info!("Loaded config from: {:?}", path),
        None => info!("No config file found, using defaults"),
    }

    match cli.command {
        Commands::Train(args) => train::run(args, &settings).await,
        Commands::Grid(args) => grid_cmd::run(args, &settings).await,
        Commands::Config(cmd) => config::run(cmd, &settings).await,
    }
}
