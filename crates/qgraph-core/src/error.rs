//! Error types for qgraph

use thiserror::Error;

/// Structural problems that can be detected before training starts.
///
/// These are always fatal to the call that detects them and are never
/// repaired silently.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("action {action} in state {state} has no outcomes")]
    NoOutcomes { state: String, action: String },

    #[error(
        "outcome probabilities of action {action} in state {state} sum to {sum}, \
         expected 1 within {epsilon}"
    )]
    ProbabilitySum {
        state: String,
        action: String,
        sum: f64,
        epsilon: f64,
    },

    #[error("outcome {target} of {state}/{action} has probability {probability} outside [0, 1]")]
    ProbabilityOutOfRange {
        state: String,
        action: String,
        target: String,
        probability: f64,
    },

    #[error("state {0} is already registered")]
    DuplicateState(String),
}

/// Main error type for qgraph
#[derive(Error, Debug)]
pub enum QGraphError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Empty action: {0} has no outcomes to pick from")]
    EmptyAction(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid graph definition: {0}")]
    Definition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QGraphError {
    /// True for errors caused by the structure of the graph rather than by I/O
    /// or by the caller's parameters.
    pub fn is_configuration(&self) -> bool {
        matches!(self, QGraphError::Configuration(_))
    }
}

/// Result type alias for qgraph operations
pub type Result<T> = std::result::Result<T, QGraphError>;
