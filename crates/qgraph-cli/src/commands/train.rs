//! `qgraph train` - train a graph from a definition file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::{info, warn};

use qgraph_core::TrainingParams;
use qgraph_rl::{GraphDefinition, LearningEngine, LearningService, TableSnapshot};

use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Graph definition (.toml or .json), or a table snapshot with --resume
    pub graph: PathBuf,

    /// Number of episodes (overrides config and the graph file)
    #[arg(short, long)]
    pub episodes: Option<u64>,

    /// Seed for reproducible runs
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Treat the input as a snapshot written by --output and continue training it
    #[arg(long)]
    pub resume: bool,

    /// Write the trained table as a JSON snapshot
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the training report and policy as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print every state, action and outcome
    #[arg(long)]
    pub structure: bool,
}

pub async fn run(args: TrainArgs, settings: &Settings) -> Result<()> {
    let mut engine = load_engine(&args.graph, args.resume, &settings.training)?;
    if let Some(episodes) = args.episodes {
        engine.params_mut().episodes = episodes;
    }

    for problem in engine.validation_errors() {
        warn!("{problem}");
    }

    let mut service = LearningService::new(engine);
    if let Some(seed) = args.seed {
        service = service.with_seed(seed);
    }
    let service = Arc::new(service);

    // Ctrl-C stops the run at the next episode boundary
    let interrupt = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current episode");
                service.cancel();
            }
        })
    };

    let result = service.train().await;
    interrupt.abort();
    let report = result.context("Training failed")?;

    if args.json {
        let policy = service.policy().await;
        let output = json!({
            "report": report,
            "policy": policy,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Trained {} episodes ({} updates, {} reached a terminal state, {} hit the step cap){}",
            report.episodes,
            report.updates,
            report.terminal_arrivals,
            report.step_cap_hits,
            if report.cancelled { ", cancelled" } else { "" }
        );
        println!();
        if args.structure {
            println!("{}", service.read(LearningEngine::structure_report).await);
        }
        println!("{}", service.read(LearningEngine::policy_report).await);
    }

    if let Some(path) = &args.output {
        let snapshot = service.read(LearningEngine::snapshot).await;
        write_snapshot(path, &snapshot)?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(())
}

/// Build the engine from a definition or a snapshot.
///
/// A definition's own `[training]` section wins over the configured parameters.
fn load_engine(path: &Path, resume: bool, configured: &TrainingParams) -> Result<LearningEngine> {
    if resume {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: TableSnapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;
        return Ok(LearningEngine::from_snapshot(snapshot)?);
    }

    let definition = GraphDefinition::load(path)
        .with_context(|| format!("Failed to load graph {}", path.display()))?;
    let params = definition
        .training
        .clone()
        .unwrap_or_else(|| configured.clone());
    Ok(definition.build_with_params(params)?)
}

fn write_snapshot(path: &Path, snapshot: &TableSnapshot) -> Result<()> {
    let contents = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))
}
