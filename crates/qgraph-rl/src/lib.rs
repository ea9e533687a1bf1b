//! qgraph RL - Tabular reinforcement learning over named state graphs
//!
//! States, actions and probabilistic action outcomes are registered with a
//! [`LearningEngine`], which learns outcome values through episodic Q-value
//! backups and exposes the resulting greedy policy.
//!
//! ```
//! use qgraph_rl::{Action, ActionOutcome, LearningEngine, State};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut engine = LearningEngine::new();
//! engine
//!     .add_state(State::new("A").with_action(
//!         Action::from_to("A", "B").with_outcome(ActionOutcome::new("B", 1.0, 100.0)),
//!     ))
//!     .unwrap();
//! engine.add_state(State::new("B")).unwrap();
//! engine.add_terminal_state("B");
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! engine.run_training(&mut rng).unwrap();
//!
//! let entry = engine.policy_for("A").unwrap();
//! assert_eq!(entry.action_name().unwrap().to_string(), "from_A_to_B");
//! ```

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
pub mod definition;
pub mod engine;
pub mod policy;
pub mod service;
pub mod state;

pub use algorithm::{selector_from_name, ActionSelector, EpsilonGreedy, Greedy, UniformRandom};
pub use definition::GraphDefinition;
pub use engine::{CancelFlag, LearningEngine, TableSnapshot, TrainingReport};
pub use policy::{PolicyChoice, PolicyEntry};
pub use service::LearningService;
pub use state::{Action, ActionName, ActionOutcome, Reward, State};

pub use qgraph_core::{ConfigurationError, QGraphError, Result, TrainingParams, UpdateRule};
