//! State, Action, and ActionOutcome types
//!
//! The table is a strict ownership tree: a [`State`] owns its [`Action`]s and
//! an action owns its [`ActionOutcome`]s. Outcomes refer to their target state
//! by name only, so cyclic graphs never create ownership cycles and a target
//! may be registered after the outcome that names it.

use std::fmt;

use serde::{Deserialize, Serialize};

use qgraph_core::util::{action_name_from_to, pretty};
use qgraph_core::{ConfigurationError, QGraphError, Result};

/// Reward value from environment
pub type Reward = f64;

/// Name of an action, either a plain label or an origin/destination pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionName {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ActionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            from: name.into(),
            to: None,
        }
    }

    pub fn from_to(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Some(to.into()),
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.to {
            Some(to) => f.write_str(&action_name_from_to(&self.from, to)),
            None => f.write_str(&self.from),
        }
    }
}

impl From<&str> for ActionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ActionName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// One probabilistic result of taking an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    target_state: String,
    #[serde(default)]
    origin_state: String,
    probability: f64,
    reward: Reward,
    #[serde(default)]
    q_value: f64,
}

impl ActionOutcome {
    /// Create an outcome with a learned value of 0.
    ///
    /// Construction never fails; probability ranges are checked by
    /// [`Action::validate_outcome_probabilities`].
    pub fn new(target_state: impl Into<String>, probability: f64, reward: Reward) -> Self {
        Self {
            target_state: target_state.into(),
            origin_state: String::new(),
            probability,
            reward,
            q_value: 0.0,
        }
    }

    /// Deterministic outcome (probability 1).
    pub fn certain(target_state: impl Into<String>, reward: Reward) -> Self {
        Self::new(target_state, 1.0, reward)
    }

    pub fn with_q_value(mut self, q_value: f64) -> Self {
        self.q_value = q_value;
        self
    }

    pub fn target_state(&self) -> &str {
        &self.target_state
    }

    /// Name of the state owning the action this outcome belongs to.
    pub fn origin_state(&self) -> &str {
        &self.origin_state
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn reward(&self) -> Reward {
        self.reward
    }

    pub fn q_value(&self) -> f64 {
        self.q_value
    }

    /// `q_value * probability`, the quantity compared when picking actions.
    pub fn estimated_value(&self) -> f64 {
        self.q_value * self.probability
    }

    pub fn set_q_value(&mut self, q_value: f64) {
        self.q_value = q_value;
    }

    /// Replace the reward, used by online callers that shape rewards per tick.
    pub fn set_reward(&mut self, reward: Reward) {
        self.reward = reward;
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State {}, Prob. {}, Reward {}, PrevState {}, QE {}",
            self.target_state,
            pretty(self.probability),
            self.reward,
            self.origin_state,
            pretty(self.estimated_value())
        )
    }
}

/// A named transition available from a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    name: ActionName,
    origin_state: String,
    #[serde(default)]
    outcomes: Vec<ActionOutcome>,
}

impl Action {
    pub fn new(origin_state: impl Into<String>, name: impl Into<ActionName>) -> Self {
        Self {
            name: name.into(),
            origin_state: origin_state.into(),
            outcomes: Vec::new(),
        }
    }

    /// Action leaving `from` named `from_{from}_to_{to}`.
    ///
    /// No outcome is added; `to` only contributes to the name.
    pub fn from_to(from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        Self::new(from.clone(), ActionName::from_to(from, to))
    }

    pub fn with_outcome(mut self, outcome: ActionOutcome) -> Self {
        self.add_outcome(outcome);
        self
    }

    /// Append an outcome. No validation happens here.
    pub fn add_outcome(&mut self, mut outcome: ActionOutcome) {
        outcome.origin_state.clone_from(&self.origin_state);
        self.outcomes.push(outcome);
    }

    pub fn name(&self) -> &ActionName {
        &self.name
    }

    pub fn origin_state(&self) -> &str {
        &self.origin_state
    }

    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    pub fn outcome_mut(&mut self, index: usize) -> Option<&mut ActionOutcome> {
        self.outcomes.get_mut(index)
    }

    pub fn probability_sum(&self) -> f64 {
        self.outcomes.iter().map(ActionOutcome::probability).sum()
    }

    /// Highest estimated value among this action's outcomes.
    pub fn max_estimated_value(&self) -> Option<f64> {
        self.outcomes
            .iter()
            .map(ActionOutcome::estimated_value)
            .fold(None, |max, value| match max {
                Some(m) if m >= value => Some(m),
                _ => Some(value),
            })
    }

    /// The outcome probabilities must be in range and sum to 1 within `epsilon`.
    pub fn validate_outcome_probabilities(
        &self,
        epsilon: f64,
    ) -> std::result::Result<(), ConfigurationError> {
        if self.outcomes.is_empty() {
            return Err(ConfigurationError::NoOutcomes {
                state: self.origin_state.clone(),
                action: self.name.to_string(),
            });
        }

        if let Some(outcome) = self
            .outcomes
            .iter()
            .find(|o| !(0.0..=1.0).contains(&o.probability))
        {
            return Err(ConfigurationError::ProbabilityOutOfRange {
                state: self.origin_state.clone(),
                action: self.name.to_string(),
                target: outcome.target_state.clone(),
                probability: outcome.probability,
            });
        }

        let sum = self.probability_sum();
        if (1.0 - sum).abs() > epsilon {
            return Err(ConfigurationError::ProbabilitySum {
                state: self.origin_state.clone(),
                action: self.name.to_string(),
                sum,
                epsilon,
            });
        }

        Ok(())
    }

    /// Index of the outcome selected by a uniform draw in `[0, 1)`.
    ///
    /// Walks the outcomes accumulating probability and returns the first whose
    /// cumulative probability reaches the draw. When the probabilities sum to
    /// slightly less than 1 and the draw lands in the gap, the last outcome is
    /// returned.
    pub fn pick_outcome_index(&self, draw: f64) -> Result<usize> {
        if self.outcomes.is_empty() {
            return Err(QGraphError::EmptyAction(self.name.to_string()));
        }

        let mut cumulative = 0.0;
        for (index, outcome) in self.outcomes.iter().enumerate() {
            cumulative += outcome.probability;
            if draw <= cumulative {
                return Ok(index);
            }
        }

        Ok(self.outcomes.len() - 1)
    }

    pub fn pick_outcome_by_probability(&self, draw: f64) -> Result<&ActionOutcome> {
        let index = self.pick_outcome_index(draw)?;
        Ok(&self.outcomes[index])
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ActionName {} probability sum: {} outcomes: {}",
            self.name,
            pretty(self.probability_sum()),
            self.outcomes.len()
        )
    }
}

/// A named node of the decision graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    name: String,
    #[serde(default)]
    actions: Vec<Action>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.add_action(action);
        self
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub(crate) fn action_mut(&mut self, index: usize) -> Option<&mut Action> {
        self.actions.get_mut(index)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateName {}", self.name)
    }
}
