//! Action selection strategies
//!
//! Training always explores uniformly at random. The selectors here serve
//! online callers that read the learned table at decision time.

use rand::{Rng, RngCore};

use crate::state::State;

/// Index and estimated value of the best action of a state.
///
/// Scans actions in order and, within each action, outcomes in order; the
/// first outcome reaching the maximum decides, so ties go to the earliest
/// action. `None` when no action has any outcome.
pub fn best_action(state: &State) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (index, action) in state.actions().iter().enumerate() {
        for outcome in action.outcomes() {
            let value = outcome.estimated_value();
            if best.map_or(true, |(_, max)| value > max) {
                best = Some((index, value));
            }
        }
    }

    best
}

/// Trait for strategies picking an action of a state
pub trait ActionSelector: Send + Sync {
    /// Selector name
    fn name(&self) -> &str;

    /// Pick an action index, `None` if the state has no actions
    fn select(&mut self, state: &State, rng: &mut dyn RngCore) -> Option<usize>;

    /// Called after each online step, e.g. to decay exploration
    fn update(&mut self) {}
}

/// Uniformly random choice, the strategy training uses
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandom;

impl ActionSelector for UniformRandom {
    fn name(&self) -> &str {
        "uniform"
    }

    fn select(&mut self, state: &State, rng: &mut dyn RngCore) -> Option<usize> {
        let count = state.actions().len();
        if count == 0 {
            return None;
        }
        Some(rng.gen_range(0..count))
    }
}

/// Always the highest estimated value
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl ActionSelector for Greedy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn select(&mut self, state: &State, _rng: &mut dyn RngCore) -> Option<usize> {
        best_action(state).map(|(index, _)| index).or_else(|| {
            // Actions without outcomes still form a valid choice
            (!state.actions().is_empty()).then_some(0)
        })
    }
}

/// Random action with probability `epsilon`, greedy otherwise
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
    decay: f64,
    min_epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            decay: 1.0,
            min_epsilon: 0.0,
        }
    }

    /// Multiply epsilon by `decay` after every step, never going below `min_epsilon`
    pub fn with_decay(mut self, decay: f64, min_epsilon: f64) -> Self {
        self.decay = decay;
        self.min_epsilon = min_epsilon;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new(0.1).with_decay(0.999, 0.01)
    }
}

impl ActionSelector for EpsilonGreedy {
    fn name(&self) -> &str {
        "epsilon_greedy"
    }

    fn select(&mut self, state: &State, rng: &mut dyn RngCore) -> Option<usize> {
        if rng.gen::<f64>() < self.epsilon {
            UniformRandom.select(state, rng)
        } else {
            Greedy.select(state, rng)
        }
    }

    fn update(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.min_epsilon);
    }
}

/// Look up a selector by name: `uniform`, `greedy` or `epsilon_greedy`.
pub fn selector_from_name(name: &str, epsilon: f64) -> Option<Box<dyn ActionSelector>> {
    match name {
        "uniform" => Some(Box::new(UniformRandom)),
        "greedy" => Some(Box::new(Greedy)),
        "epsilon_greedy" => Some(Box::new(EpsilonGreedy::new(epsilon))),
        _ => None,
    }
}
