//! Grid world driving the engine the way a tile-based game character does
//!
//! Every cell `x,y` is a state with four moves. Moving into the border keeps
//! the character in place. Reaching the goal pays `goal_reward` and restarts
//! the walk from the origin; every other move pays `step_reward`.

use anyhow::Result;
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

use qgraph_core::TrainingParams;
use qgraph_rl::{Action, ActionOutcome, ActionSelector, LearningEngine, State};

pub type Position = (i32, i32);

/// Moves in action order: every cell registers them in this order
pub const MOVES: [(&str, i32, i32); 4] = [
    ("right", 1, 0),
    ("left", -1, 0),
    ("up", 0, 1),
    ("down", 0, -1),
];

#[derive(Debug, Clone)]
pub struct GridWorld {
    pub size: i32,
    pub goal: Position,
    pub goal_reward: f64,
    pub step_reward: f64,
}

/// Outcome of an online walk
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkSummary {
    pub ticks: u64,
    pub goals_reached: u64,
    pub total_reward: f64,
    /// Ticks taken by the last completed walk from the origin to the goal
    pub last_walk_length: Option<u64>,
}

impl GridWorld {
    pub fn state_name(position: Position) -> String {
        format!("{},{}", position.0, position.1)
    }

    /// Position after taking move `index` from `from`
    pub fn step(&self, from: Position, index: usize) -> Position {
        let (_, dx, dy) = MOVES[index % MOVES.len()];
        (
            (from.0 + dx).clamp(0, self.size - 1),
            (from.1 + dy).clamp(0, self.size - 1),
        )
    }

    pub fn reward_for(&self, position: Position) -> f64 {
        if position == self.goal {
            self.goal_reward
        } else {
            self.step_reward
        }
    }

    /// Build an engine holding every cell. The goal is a terminal sink with
    /// no actions, so its value stays 0.
    pub fn build_engine(&self, params: TrainingParams) -> Result<LearningEngine> {
        anyhow::ensure!(self.size > 0, "grid size must be positive");
        anyhow::ensure!(
            (0..self.size).contains(&self.goal.0) && (0..self.size).contains(&self.goal.1),
            "goal {:?} lies outside a {}x{} grid",
            self.goal,
            self.size,
            self.size
        );
        // Walks restart at the origin, so a goal there would end every walk at once
        anyhow::ensure!(self.goal != (0, 0), "goal must not be the start cell (0,0)");

        let mut engine = LearningEngine::with_params(params);

        for x in 0..self.size {
            for y in 0..self.size {
                let name = Self::state_name((x, y));
                let mut state = State::new(name.clone());
                if (x, y) == self.goal {
                    engine.add_state(state)?;
                    continue;
                }
                for (index, (label, _, _)) in MOVES.iter().enumerate() {
                    let target = self.step((x, y), index);
                    state.add_action(Action::new(name.clone(), *label).with_outcome(
                        ActionOutcome::certain(Self::state_name(target), self.reward_for(target)),
                    ));
                }
                engine.add_state(state)?;
            }
        }

        engine.add_terminal_state(Self::state_name(self.goal));
        debug!(size = self.size, goal = ?self.goal, "Grid engine built");
        Ok(engine)
    }

    /// Play `ticks` decisions, feeding each reward back into the table.
    pub fn walk(
        &self,
        engine: &mut LearningEngine,
        selector: &mut dyn ActionSelector,
        rng: &mut dyn RngCore,
        ticks: u64,
    ) -> Result<WalkSummary> {
        let mut summary = WalkSummary::default();
        let mut position: Position = (0, 0);
        let mut walk_length: u64 = 0;

        for _ in 0..ticks {
            let state = Self::state_name(position);
            let Some(action_index) = engine.choose_action(&state, selector, rng)? else {
                break;
            };

            let next = self.step(position, action_index);
            let reward = self.reward_for(next);
            engine.observe(&state, action_index, 0, reward)?;
            selector.update();

            summary.ticks += 1;
            summary.total_reward += reward;
            walk_length += 1;

            if next == self.goal {
                summary.goals_reached += 1;
                summary.last_walk_length = Some(walk_length);
                walk_length = 0;
                position = (0, 0);
            } else {
                position = next;
            }
        }

        Ok(summary)
    }

    /// Arrow map of the greedy policy, top row first
    pub fn render_policy(&self, engine: &LearningEngine) -> String {
        let mut out = String::new();
        for y in (0..self.size).rev() {
            for x in 0..self.size {
                let cell = if (x, y) == self.goal {
                    'G'
                } else {
                    match engine.greedy_action(&Self::state_name((x, y))) {
                        Some((0, _)) => '>',
                        Some((1, _)) => '<',
                        Some((2, _)) => '^',
                        Some((3, _)) => 'v',
                        _ => '.',
                    }
                };
                out.push(cell);
            }
            out.push('\n');
        }
        out
    }
}
