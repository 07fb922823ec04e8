//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::ingest::ExclusionList;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Worker threads for aggregation; 1 runs sequentially
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Write a primary table per monthly game file
    #[serde(default = "default_monthly_tables")]
    pub monthly_tables: bool,
}

fn default_threads() -> usize {
    1
}

fn default_monthly_tables() -> bool {
    true
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            monthly_tables: default_monthly_tables(),
        }
    }
}

/// Games left out of the statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// Start from the curated list of known bad games
    #[serde(default = "default_use_builtin")]
    pub use_builtin: bool,

    /// Additional game ids to skip
    #[serde(default)]
    pub extra_games: Vec<String>,
}

fn default_use_builtin() -> bool {
    true
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            use_builtin: default_use_builtin(),
            extra_games: Vec::new(),
        }
    }
}

impl ExclusionConfig {
    pub fn to_list(&self) -> ExclusionList {
        let base = if self.use_builtin {
            ExclusionList::builtin()
        } else {
            ExclusionList::empty()
        };
        base.with_games(self.extra_games.iter().cloned())
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working data (outcome cache)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Downloaded game files (`*.json`)
    #[serde(default = "default_games_dir")]
    pub games_dir: PathBuf,

    /// Player ratings dump
    #[serde(default = "default_ratings_path")]
    pub ratings_path: PathBuf,

    /// Where bucket tables are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub aggregate: AggregateConfig,

    #[serde(default)]
    pub exclusions: ExclusionConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_games_dir() -> PathBuf {
    PathBuf::from("./games")
}

fn default_ratings_path() -> PathBuf {
    PathBuf::from("./ratings.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            games_dir: default_games_dir(),
            ratings_path: default_ratings_path(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
            aggregate: AggregateConfig::default(),
            exclusions: ExclusionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, defaults otherwise.
    pub fn load_or_default(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate.threads == 0 {
            return Err(ConfigError::ValidationError(
                "Aggregation threads must be greater than 0".to_string(),
            ));
        }

        if self.games_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Games directory must not be empty".to_string(),
            ));
        }

        if let Some(blank) = self.exclusions.extra_games.iter().find(|g| g.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Excluded game id must not be blank: {:?}",
                blank
            )));
        }

        Ok(())
    }
}
