//! Configuration loading for the qgraph CLI

use std::path::{Path, PathBuf};

use ::config::{ConfigBuilder, Environment, File, Map};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qgraph_core::TrainingParams;

/// Configuration for the CLI
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Configuration file the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
    pub log: LogConfig,
    pub training: TrainingParams,
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: i32,
    pub goal: [i32; 2],
    pub goal_reward: f64,
    pub step_reward: f64,
    /// Online decision ticks after offline training
    pub ticks: u64,
    /// Selector used for online play: `epsilon_greedy`, `greedy` or `uniform`
    pub selector: String,
    pub exploration: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 8,
            goal: [7, 7],
            goal_reward: 100.0,
            step_reward: -1.0,
            ticks: 500,
            selector: "epsilon_greedy".to_string(),
            exploration: 0.3,
        }
    }
}

impl Settings {
    /// Load configuration from file and environment.
    ///
    /// An explicit path must exist; otherwise the standard locations are
    /// searched and defaults are used when nothing is found. The file used
    /// is kept in `source` so it can be logged once tracing is up.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_env(explicit, None)
    }

    /// Like [`load`](Self::load), reading `QGRAPH__` overrides from `env`
    /// instead of the process environment when given.
    fn load_with_env(explicit: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = ConfigBuilder::<::config::builder::DefaultState>::default();

        let source = match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path.to_path_buf()).required(true));
                Some(path.to_path_buf())
            }
            None => {
                let found = Self::find_config_file();
                if let Some(path) = &found {
                    builder = builder.add_source(File::from(path.clone()).required(false));
                }
                found
            }
        };

        // Environment variables like QGRAPH__TRAINING__ALPHA=0.2
        builder = builder.add_source(
            Environment::with_prefix("QGRAPH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings = builder.build()?;

        let mut settings: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        settings.source = source;
        Ok(settings)
    }

    /// Find the configuration file: ./qgraph.toml, then ~/.config/qgraph/qgraph.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from("qgraph.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("qgraph").join("qgraph.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.source.is_none());
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.training.alpha, 0.1);
        assert_eq!(settings.grid.goal, [7, 7]);
        assert_eq!(settings.grid.exploration, 0.3);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qgraph.toml");
        std::fs::write(
            &path,
            r#"
[log]
level = "debug"

[training]
gamma = 0.5
episodes = 10

[grid]
size = 4
goal = [3, 3]
"#,
        )
        .unwrap();

        let settings = Settings::load_with_env(Some(&path), Some(Map::new())).unwrap();
        assert_eq!(settings.source.as_deref(), Some(path.as_path()));
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.log.format, "pretty");
        assert_eq!(settings.training.gamma, 0.5);
        assert_eq!(settings.training.alpha, 0.1);
        assert_eq!(settings.training.episodes, 10);
        assert_eq!(settings.grid.size, 4);
        assert_eq!(settings.grid.goal, [3, 3]);
        assert_eq!(settings.grid.ticks, 500);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qgraph.toml");
        std::fs::write(&path, "[training]\nalpha = 0.3\nepisodes = 10\n").unwrap();

        let mut env = Map::new();
        env.insert("QGRAPH__TRAINING__ALPHA".to_string(), "0.25".to_string());
        env.insert("QGRAPH__LOG__FORMAT".to_string(), "json".to_string());
        env.insert("QGRAPH__GRID__TICKS".to_string(), "77".to_string());

        let settings = Settings::load_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(settings.training.alpha, 0.25);
        assert_eq!(settings.training.episodes, 10);
        assert_eq!(settings.log.format, "json");
        assert_eq!(settings.grid.ticks, 77);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_example_file_parses() {
        let example: Settings =
            toml::from_str(include_str!("../../../qgraph.toml.example")).unwrap();
        assert_eq!(example.training.episodes, 1000);
        assert_eq!(example.grid.selector, "epsilon_greedy");
    }
}
