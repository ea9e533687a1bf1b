//! Graph definition files
//!
//! A graph can be described in TOML or JSON:
//!
//! ```toml
//! terminal_states = ["S2"]
//!
//! [training]
//! episodes = 500
//!
//! [[states]]
//! name = "S0"
//!
//! [[states.actions]]
//! to = "S1"
//! reward = -1.0
//!
//! [[states]]
//! name = "S1"
//!
//! [[states.actions]]
//! name = "advance"
//! outcomes = [{ target = "S2", probability = 0.9, reward = 100.0 },
//!             { target = "S1", probability = 0.1, reward = -1.0 }]
//!
//! [[states]]
//! name = "S2"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use qgraph_core::{QGraphError, Result, TrainingParams};

use crate::engine::LearningEngine;
use crate::state::{Action, ActionName, ActionOutcome, State};

fn default_probability() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Overrides of the default training parameters
    #[serde(default)]
    pub training: Option<TrainingParams>,

    #[serde(default)]
    pub terminal_states: Vec<String>,

    #[serde(default)]
    pub states: Vec<StateDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDefinition {
    pub name: String,

    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

/// An action is named either explicitly or by its destination.
///
/// With `to` set and no `outcomes`, the action gets a single certain outcome
/// into `to` carrying `reward`. Setting `reward` next to `outcomes` is an
/// error, since each outcome carries its own reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub to: Option<String>,

    #[serde(default)]
    pub reward: Option<f64>,

    #[serde(default)]
    pub outcomes: Vec<OutcomeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeDefinition {
    pub target: String,

    #[serde(default = "default_probability")]
    pub probability: f64,

    #[serde(default)]
    pub reward: f64,

    #[serde(default)]
    pub q_value: f64,
}

impl GraphDefinition {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load a definition, choosing the format from the file extension
    /// (`.json` is JSON, anything else is TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        debug!("Loading graph definition from {:?}", path);

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    /// Build an engine, using the file's `[training]` section when present.
    pub fn build(&self) -> Result<LearningEngine> {
        let params = self.training.clone().unwrap_or_default();
        self.build_with_params(params)
    }

    pub fn build_with_params(&self, params: TrainingParams) -> Result<LearningEngine> {
        let mut engine = LearningEngine::with_params(params);

        for state_def in &self.states {
            let mut state = State::new(state_def.name.clone());
            for action_def in &state_def.actions {
                state.add_action(action_def.to_action(&state_def.name)?);
            }
            engine.add_state(state)?;
        }

        for name in &self.terminal_states {
            engine.add_terminal_state(name.clone());
        }

        debug!(
            states = engine.len(),
            terminals = self.terminal_states.len(),
            "Graph definition built"
        );

        Ok(engine)
    }
}

impl ActionDefinition {
    fn to_action(&self, origin: &str) -> Result<Action> {
        let name = match (&self.name, &self.to) {
            (Some(name), _) => ActionName::new(name.clone()),
            (None, Some(to)) => ActionName::from_to(origin, to.clone()),
            (None, None) => {
                return Err(QGraphError::Definition(format!(
                    "an action of state {origin} needs a name or a destination"
                )))
            }
        };

        if self.reward.is_some() && !self.outcomes.is_empty() {
            return Err(QGraphError::Definition(format!(
                "action {name} of state {origin} sets both reward and outcomes, \
                 put the reward on each outcome instead"
            )));
        }

        let mut action = Action::new(origin, name);

        if self.outcomes.is_empty() {
            if let Some(to) = &self.to {
                action.add_outcome(ActionOutcome::certain(
                    to.clone(),
                    self.reward.unwrap_or_default(),
                ));
            }
        } else {
            for outcome in &self.outcomes {
                action.add_outcome(
                    ActionOutcome::new(outcome.target.clone(), outcome.probability, outcome.reward)
                        .with_q_value(outcome.q_value),
                );
            }
        }

        Ok(action)
    }
}
