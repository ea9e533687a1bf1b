//! qgraph Core - Core types and shared functionality
//!
//! This crate provides the error taxonomy, training hyperparameters and
//! formatting helpers used by the learning engine and the CLI.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod params;
pub mod util;

pub use error::{ConfigurationError, QGraphError, Result};
pub use params::{TrainingParams, UpdateRule};
