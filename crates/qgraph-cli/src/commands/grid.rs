//! `qgraph grid` - learn a grid world offline, then keep learning while playing

use anyhow::{anyhow, Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;

use qgraph_rl::selector_from_name;

use crate::grid::{GridWorld, Position};
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct GridArgs {
    /// Side length of the square grid
    #[arg(long)]
    pub size: Option<i32>,

    /// Goal cell as X,Y
    #[arg(long, value_parser = parse_position)]
    pub goal: Option<Position>,

    /// Offline training episodes before play
    #[arg(short, long)]
    pub episodes: Option<u64>,

    /// Online decisions after training
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// Selector for online play: epsilon_greedy, greedy or uniform
    #[arg(long)]
    pub selector: Option<String>,

    /// Exploration rate for epsilon_greedy
    #[arg(long)]
    pub exploration: Option<f64>,

    /// Seed for reproducible runs
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_position(value: &str) -> Result<Position, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let x = x.trim().parse().map_err(|e| format!("invalid X '{x}': {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("invalid Y '{y}': {e}"))?;
    Ok((x, y))
}

pub async fn run(args: GridArgs, settings: &Settings) -> Result<()> {
    let config = &settings.grid;
    let world = GridWorld {
        size: args.size.unwrap_or(config.size),
        goal: args.goal.unwrap_or((config.goal[0], config.goal[1])),
        goal_reward: config.goal_reward,
        step_reward: config.step_reward,
    };

    let mut params = settings.training.clone();
    if let Some(episodes) = args.episodes {
        params.episodes = episodes;
    }
    let ticks = args.ticks.unwrap_or(config.ticks);
    let selector_name = args.selector.as_deref().unwrap_or(&config.selector);
    let exploration = args.exploration.unwrap_or(config.exploration);

    let mut selector = selector_from_name(selector_name, exploration)
        .ok_or_else(|| anyhow!("Unknown selector '{selector_name}'"))?;

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut engine = world.build_engine(params).context("Failed to build grid")?;
    info!(size = world.size, goal = ?world.goal, seed, "Training grid world");

    let report = engine.run_training(&mut rng)?;
    let trained_map = world.render_policy(&engine);

    info!(ticks, selector = selector.name(), "Playing");
    let summary = world.walk(&mut engine, selector.as_mut(), &mut rng, ticks)?;

    if args.json {
        let output = json!({
            "seed": seed,
            "training": report,
            "play": summary,
            "policy": engine.extract_policy(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Trained {} episodes on a {}x{} grid (seed {seed})",
        report.episodes, world.size, world.size
    );
    println!("\nPolicy after training:\n{trained_map}");
    println!(
        "Played {} ticks with {}: reached the goal {} times, total reward {}",
        summary.ticks,
        selector.name(),
        summary.goals_reached,
        qgraph_core::util::pretty(summary.total_reward)
    );
    if let Some(length) = summary.last_walk_length {
        println!("Last walk to the goal took {length} steps");
    }
    println!("\nPolicy after play:\n{}", world.render_policy(&engine));

    Ok(())
}
