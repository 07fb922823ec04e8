//! Filesystem storage.
//!
//! Handles reading and writing everything the pipeline keeps on disk:
//! - Downloaded game files
//! - The outcome cache (JSONL) and its manifest
//! - Published bucket tables

pub mod cache;
pub mod games;
pub mod jsonl;
pub mod tables;

use std::path::PathBuf;
use thiserror::Error;

use crate::calculate::{BankError, KeyVariant};

pub use cache::{fingerprint_files, CacheManifest, OutcomeCache};
pub use games::{list_game_files, monthly_table_name, read_games};
pub use jsonl::JsonlStore;
pub use tables::{read_table, write_table};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Stored table does not fit: {0}")]
    Table(#[from] BankError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub games_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            games_dir: data_dir.join("games"),
            output_dir: data_dir.join("docs"),
            data_dir,
        }
    }

    pub fn with_games_dir(mut self, dir: PathBuf) -> Self {
        self.games_dir = dir;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn outcomes_path(&self) -> PathBuf {
        self.cache_dir().join("outcomes.jsonl")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.cache_dir().join("manifest.json")
    }

    /// Published table of a key variant.
    pub fn table_path(&self, variant: KeyVariant) -> PathBuf {
        self.output_dir.join(variant.table_name())
    }

    pub fn monthly_table_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
