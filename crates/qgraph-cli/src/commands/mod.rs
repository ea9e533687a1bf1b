//! CLI command modules

pub mod config;
pub mod grid;
pub mod train;
