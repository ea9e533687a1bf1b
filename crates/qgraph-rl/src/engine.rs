//! Learning Engine - owns the state table and runs training and inference

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use qgraph_core::{ConfigurationError, QGraphError, Result, TrainingParams};

use crate::algorithm::{best_action, ActionSelector};
use crate::policy::{self, PolicyEntry};
use crate::state::{Action, Reward, State};

/// Cooperative cancellation for a training run.
///
/// Checked between episodes only, so a cancelled run never leaves an episode
/// half applied.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Episodes run to completion
    pub episodes: u64,
    /// Q-value updates applied
    pub updates: u64,
    /// Episodes stopped by the step cap
    pub step_cap_hits: u64,
    /// Episodes that ended in a terminal state
    pub terminal_arrivals: u64,
    pub cancelled: bool,
}

/// Serializable copy of the whole table, used to persist a trained engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub params: TrainingParams,
    pub terminal_states: Vec<String>,
    pub states: Vec<State>,
}

/// Tabular Q-learning engine over a graph of named states.
///
/// States live in an arena (`states`) in insertion order; `state_index` maps
/// each name to its slot. Outcomes name their targets, so transitions are
/// resolved through the index at the moment they are taken.
#[derive(Debug, Clone, Default)]
pub struct LearningEngine {
    states: Vec<State>,
    state_index: HashMap<String, usize>,
    terminal_states: HashSet<String>,
    params: TrainingParams,
}

impl LearningEngine {
    /// Create an engine with default hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: TrainingParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut TrainingParams {
        &mut self.params
    }

    /// Get parameters as JSON
    pub fn get_params(&self) -> serde_json::Value {
        let mut params = self.params.to_json();
        params["state_count"] = serde_json::json!(self.states.len());
        params["terminal_count"] = serde_json::json!(self.terminal_states.len());
        params
    }

    /// Set parameters from JSON, only the keys present are changed
    pub fn set_params(&mut self, params: &serde_json::Value) -> Result<()> {
        self.params.apply_json(params)?;
        info!("Training parameters updated: {}", self.params.to_json());
        Ok(())
    }

    /// Register a state. Names are unique; a duplicate is rejected, never overwritten.
    pub fn add_state(&mut self, state: State) -> Result<()> {
        if self.state_index.contains_key(state.name()) {
            return Err(ConfigurationError::DuplicateState(state.name().to_string()).into());
        }

        self.state_index
            .insert(state.name().to_string(), self.states.len());
        self.states.push(state);
        Ok(())
    }

    /// Mark a state name as terminal. The state does not have to exist yet.
    pub fn add_terminal_state(&mut self, name: impl Into<String>) {
        self.terminal_states.insert(name.into());
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminal_states.contains(name)
    }

    /// Terminal state names, sorted for stable output
    pub fn terminal_states(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.terminal_states.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// States in insertion order
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.state_index.get(name).map(|&index| &self.states[index])
    }

    /// Append an action to a registered state.
    pub fn add_action(&mut self, state: &str, action: Action) -> Result<()> {
        let index = self.index_of(state)?;
        self.states[index].add_action(action);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.state_index
            .get(name)
            .copied()
            .ok_or_else(|| QGraphError::UnknownState(name.to_string()))
    }

    /// Check every action of every state, failing on the first problem.
    pub fn validate(&self) -> Result<()> {
        let epsilon = self.params.probability_epsilon;
        for state in &self.states {
            for action in state.actions() {
                action.validate_outcome_probabilities(epsilon)?;
            }
        }
        Ok(())
    }

    /// Every structural problem in the table, in iteration order.
    pub fn validation_errors(&self) -> Vec<ConfigurationError> {
        let epsilon = self.params.probability_epsilon;
        self.states
            .iter()
            .flat_map(State::actions)
            .filter_map(|action| action.validate_outcome_probabilities(epsilon).err())
            .collect()
    }

    /// Run `params.episodes` episodes of training.
    ///
    /// Values are updated in place and training resumes from them on the next
    /// call. A fatal error aborts the run but keeps the updates of the episodes
    /// that already ran.
    pub fn run_training<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TrainingReport> {
        self.run_training_with_cancel(rng, &CancelFlag::new())
    }

    /// Like [`run_training`](Self::run_training), stopping between episodes
    /// once `cancel` is set.
    pub fn run_training_with_cancel<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        cancel: &CancelFlag,
    ) -> Result<TrainingReport> {
        self.params.validate()?;
        self.validate()?;

        let mut report = TrainingReport::default();

        if self.states.is_empty() {
            warn!("Training requested on an empty engine");
            return Ok(report);
        }

        info!(
            episodes = self.params.episodes,
            states = self.states.len(),
            alpha = self.params.alpha,
            gamma = self.params.gamma,
            "Starting training"
        );

        for episode in 0..self.params.episodes {
            if cancel.is_cancelled() {
                info!(episode, "Training cancelled");
                report.cancelled = true;
                break;
            }

            let steps = self.run_episode(rng, &mut report)?;
            report.episodes += 1;
            debug!(episode, steps, "Episode complete");
        }

        info!(
            episodes = report.episodes,
            updates = report.updates,
            step_cap_hits = report.step_cap_hits,
            "Training complete"
        );

        Ok(report)
    }

    fn run_episode<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        report: &mut TrainingReport,
    ) -> Result<u64> {
        let max_steps = self.params.max_steps_per_episode;
        let mut state_index = rng.gen_range(0..self.states.len());
        let mut steps: u64 = 0;

        loop {
            steps += 1;
            if steps > max_steps {
                report.step_cap_hits += 1;
                if self.params.warn_on_missing_max_q {
                    warn!(
                        state = %self.states[state_index].name(),
                        count = report.step_cap_hits,
                        "Exploration did not reach a terminal state within {} steps, \
                         the terminal state may be unreachable",
                        max_steps
                    );
                }
                break;
            }

            let action_count = self.states[state_index].actions().len();
            if action_count == 0 {
                break;
            }

            // Training explores uniformly over the available actions
            let action_index = rng.gen_range(0..action_count);
            let draw: f64 = rng.gen();

            let (outcome_index, target) = {
                let action = &self.states[state_index].actions()[action_index];
                let outcome_index = action.pick_outcome_index(draw)?;
                let target = action.outcomes()[outcome_index].target_state().to_string();
                (outcome_index, target)
            };

            self.backup(state_index, action_index, outcome_index);
            report.updates += 1;

            if self.terminal_states.contains(&target) {
                report.terminal_arrivals += 1;
                break;
            }

            state_index = self.index_of(&target)?;
        }

        Ok(steps)
    }

    /// Apply the Q-value backup to one outcome and return the new value.
    fn backup(&mut self, state_index: usize, action_index: usize, outcome_index: usize) -> f64 {
        let rule = self.params.update_rule;
        let (alpha, gamma) = (self.params.alpha, self.params.gamma);

        let outcome = &self.states[state_index].actions()[action_index].outcomes()[outcome_index];
        let baseline = rule.baseline(outcome.q_value(), outcome.probability());
        let reward = outcome.reward();
        let max_q_next = self.max_q(outcome.target_state());

        let value = rule.backup(baseline, reward, max_q_next, alpha, gamma);

        if let Some(outcome) = self.states[state_index]
            .action_mut(action_index)
            .and_then(|action| action.outcome_mut(outcome_index))
        {
            outcome.set_q_value(value);
        }

        value
    }

    /// Highest estimated value reachable from `name`.
    ///
    /// Unregistered names give 0 rather than an error, since graphs are often
    /// queried while still being built. A registered state without outcomes
    /// also gives 0. Both cases warn when warnings are enabled, unless the
    /// name is a terminal state.
    pub fn max_q(&self, name: &str) -> f64 {
        const DEFAULT_VALUE: f64 = 0.0;

        let Some(&index) = self.state_index.get(name) else {
            if self.params.warn_on_missing_max_q && !self.terminal_states.contains(name) {
                warn!(state = name, "No max Q value for unregistered state");
            }
            return DEFAULT_VALUE;
        };

        let max = self.states[index]
            .actions()
            .iter()
            .filter_map(Action::max_estimated_value)
            .fold(None, |max: Option<f64>, value| match max {
                Some(m) if m >= value => Some(m),
                _ => Some(value),
            });

        match max {
            Some(value) => value,
            None => {
                // Terminal states with no actions are expected to have value 0
                if self.params.warn_on_missing_max_q && !self.terminal_states.contains(name) {
                    warn!(state = name, "No max Q value for state, it has no outcomes");
                }
                DEFAULT_VALUE
            }
        }
    }

    /// Best action per state, in insertion order. Recomputed on every call.
    pub fn extract_policy(&self) -> Vec<PolicyEntry> {
        self.states.iter().map(PolicyEntry::for_state).collect()
    }

    pub fn policy_for(&self, name: &str) -> Result<PolicyEntry> {
        self.state(name)
            .map(PolicyEntry::for_state)
            .ok_or_else(|| QGraphError::UnknownState(name.to_string()))
    }

    /// Estimated value of one outcome, if all three coordinates exist.
    pub fn value_of(&self, state: &str, action_index: usize, outcome_index: usize) -> Option<f64> {
        self.state(state)?
            .action(action_index)?
            .outcomes()
            .get(outcome_index)
            .map(|outcome| outcome.estimated_value())
    }

    /// Index and action with the highest estimated value in `state`.
    pub fn greedy_action(&self, state: &str) -> Option<(usize, &Action)> {
        let state = self.state(state)?;
        best_action(state).map(|(index, _)| (index, &state.actions()[index]))
    }

    /// Let `selector` pick an action index for online play.
    ///
    /// Returns `Ok(None)` when the state has no actions.
    pub fn choose_action(
        &self,
        state: &str,
        selector: &mut dyn ActionSelector,
        rng: &mut dyn RngCore,
    ) -> Result<Option<usize>> {
        let state = self
            .state(state)
            .ok_or_else(|| QGraphError::UnknownState(state.to_string()))?;
        Ok(selector.select(state, rng))
    }

    /// Feed back a reward observed online and apply one backup to that outcome.
    ///
    /// Uses the same update rule as training and returns the new Q-value.
    pub fn observe(
        &mut self,
        state: &str,
        action_index: usize,
        outcome_index: usize,
        reward: Reward,
    ) -> Result<f64> {
        let state_index = self.index_of(state)?;
        let outcome = self.states[state_index]
            .action_mut(action_index)
            .and_then(|action| action.outcome_mut(outcome_index))
            .ok_or_else(|| {
                QGraphError::NotFound(format!(
                    "outcome {outcome_index} of action {action_index} in state {state}"
                ))
            })?;
        outcome.set_reward(reward);

        Ok(self.backup(state_index, action_index, outcome_index))
    }

    /// Human-readable dump of every state, action and outcome.
    pub fn structure_report(&self) -> String {
        policy::structure_report(&self.states)
    }

    /// Human-readable policy, one line per state.
    pub fn policy_report(&self) -> String {
        policy::policy_report(&self.extract_policy())
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            params: self.params.clone(),
            terminal_states: self.terminal_states().into_iter().map(String::from).collect(),
            states: self.states.clone(),
        }
    }

    /// Rebuild an engine from a snapshot, re-checking state name uniqueness.
    pub fn from_snapshot(snapshot: TableSnapshot) -> Result<Self> {
        let mut engine = Self::with_params(snapshot.params);
        for state in snapshot.states {
            engine.add_state(state)?;
        }
        for name in snapshot.terminal_states {
            engine.add_terminal_state(name);
        }
        Ok(engine)
    }
}
