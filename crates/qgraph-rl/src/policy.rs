//! Policy extraction and text reports
//!
//! Reports are plain formatting over the table and return `String`s; callers
//! decide where to print them.

use std::fmt::{self, Write as _};

use serde::Serialize;

use qgraph_core::util::pretty;

use crate::algorithm::best_action;
use crate::state::{ActionName, State};

/// What the learned policy does in one state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyChoice {
    Action {
        action: ActionName,
        action_index: usize,
        estimated_value: f64,
    },
    /// The state offers nothing to choose from
    NoAction,
}

/// Policy entry for one state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyEntry {
    pub state: String,
    pub choice: PolicyChoice,
}

impl PolicyEntry {
    pub fn for_state(state: &State) -> Self {
        let choice = match best_action(state) {
            Some((index, value)) => PolicyChoice::Action {
                action: state.actions()[index].name().clone(),
                action_index: index,
                estimated_value: value,
            },
            None => PolicyChoice::NoAction,
        };

        Self {
            state: state.name().to_string(),
            choice,
        }
    }

    pub fn action_name(&self) -> Option<&ActionName> {
        match &self.choice {
            PolicyChoice::Action { action, .. } => Some(action),
            PolicyChoice::NoAction => None,
        }
    }

    pub fn estimated_value(&self) -> Option<f64> {
        match self.choice {
            PolicyChoice::Action {
                estimated_value, ..
            } => Some(estimated_value),
            PolicyChoice::NoAction => None,
        }
    }
}

impl fmt::Display for PolicyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.choice {
            PolicyChoice::Action {
                action,
                estimated_value,
                ..
            } => write!(
                f,
                "From state {} do action {}, max estimated value is {}",
                self.state,
                action,
                pretty(*estimated_value)
            ),
            PolicyChoice::NoAction => {
                write!(f, "From state {} do action nothing", self.state)
            }
        }
    }
}

/// Dump of every state, action and outcome in insertion order
pub fn structure_report(states: &[State]) -> String {
    let mut out = String::from("** Q-Learning structure **\n");

    for state in states {
        let _ = writeln!(out, "State {}", state.name());
        for action in state.actions() {
            let _ = writeln!(out, "  Action {}", action.name());
            for outcome in action.outcomes() {
                let _ = writeln!(out, "     ActionOutcome {outcome}");
            }
        }
    }

    out
}

pub fn policy_report(policy: &[PolicyEntry]) -> String {
    let mut out = String::from("** Show Policy **\n");
    for entry in policy {
        let _ = writeln!(out, "{entry}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Action, ActionOutcome};

    fn trained_state() -> State {
        State::new("A")
            .with_action(
                Action::from_to("A", "B")
                    .with_outcome(ActionOutcome::new("B", 0.5, -1.0).with_q_value(4.0))
                    .with_outcome(ActionOutcome::new("C", 0.5, -1.0).with_q_value(2.0)),
            )
            .with_action(
                Action::from_to("A", "D")
                    .with_outcome(ActionOutcome::certain("D", 10.0).with_q_value(3.0)),
            )
    }

    #[test]
    fn test_policy_entry_picks_max_estimated_value() {
        let entry = PolicyEntry::for_state(&trained_state());
        assert_eq!(entry.action_name().unwrap().to_string(), "from_A_to_D");
        assert_eq!(entry.estimated_value(), Some(3.0));
        assert!(matches!(entry.choice, PolicyChoice::Action { action_index: 1, .. }));
    }

    #[test]
    fn test_policy_entry_no_action() {
        let entry = PolicyEntry::for_state(&State::new("Goal"));
        assert_eq!(entry.choice, PolicyChoice::NoAction);
        assert_eq!(entry.to_string(), "From state Goal do action nothing");
    }

    #[test]
    fn test_policy_entry_display() {
        let entry = PolicyEntry::for_state(&trained_state());
        assert_eq!(
            entry.to_string(),
            "From state A do action from_A_to_D, max estimated value is 3"
        );
    }

    #[test]
    fn test_structure_report() {
        let report = structure_report(&[trained_state(), State::new("B")]);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "** Q-Learning structure **");
        assert_eq!(lines[1], "State A");
        assert_eq!(lines[2], "  Action from_A_to_B");
        assert_eq!(
            lines[3],
            "     ActionOutcome State B, Prob. 0.5, Reward -1, PrevState A, QE 2"
        );
        assert_eq!(lines.last(), Some(&"State B"));
    }

    #[test]
    fn test_policy_report() {
        let policy = vec![
            PolicyEntry::for_state(&trained_state()),
            PolicyEntry::for_state(&State::new("D")),
        ];
        let report = policy_report(&policy);
        assert!(report.starts_with("** Show Policy **\n"));
        assert_eq!(report.lines().count(), 3);
    }

    #[test]
    fn test_policy_entry_json() {
        let json = serde_json::to_value(PolicyEntry::for_state(&trained_state())).unwrap();
        assert_eq!(json["state"], "A");
        assert_eq!(json["choice"]["kind"], "action");
        assert_eq!(json["choice"]["action_index"], 1);
    }
}
