//! Outcome cache.
//!
//! Extracting outcomes from a few years of game files is the slow part of a
//! run, so the outcomes are kept in a JSONL file next to a manifest. The
//! manifest fingerprints the game file set (names and sizes); the cache is
//! only reused while the fingerprint matches and the run that wrote it was
//! not cancelled.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::jsonl::JsonlStore;
use super::{StorageConfig, StorageError};
use crate::ingest::IngestReport;
use crate::models::{Fingerprint, NormalizedOutcome};

/// Description of what the cached outcomes were extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub fingerprint: Fingerprint,

    /// Game file names, sorted
    pub files: Vec<String>,

    /// Outcomes written
    pub outcomes: usize,

    /// False when the run was cancelled before every file was read
    pub complete: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub report: IngestReport,
}

/// Fingerprint a set of game files by name and size.
pub fn fingerprint_files(files: &[PathBuf]) -> Result<Fingerprint, StorageError> {
    let mut fields = Vec::with_capacity(files.len() * 2);
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    for path in sorted {
        fields.push(file_name(path)?);
        fields.push(fs::metadata(path)?.len().to_string());
    }
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    Ok(Fingerprint::generate(&refs))
}

fn file_name(path: &Path) -> Result<String, StorageError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| StorageError::InvalidPath(format!("{:?}", path)))
}

/// Outcome cache under `data_dir/cache`.
pub struct OutcomeCache {
    outcomes: JsonlStore<NormalizedOutcome>,
    manifest_path: PathBuf,
}

impl OutcomeCache {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            outcomes: JsonlStore::new(config.outcomes_path()),
            manifest_path: config.manifest_path(),
        }
    }

    pub fn manifest(&self) -> Result<Option<CacheManifest>, StorageError> {
        if !self.manifest_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.manifest_path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Cached outcomes, if they were completely extracted from exactly the
    /// given file set.
    pub fn load_if_fresh(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Vec<NormalizedOutcome>>, StorageError> {
        let manifest = match self.manifest()? {
            Some(m) => m,
            None => {
                debug!("No outcome cache manifest");
                return Ok(None);
            }
        };

        if &manifest.fingerprint != fingerprint {
            info!(
                "Game files changed ({} -> {}); cache is stale",
                manifest.fingerprint, fingerprint
            );
            return Ok(None);
        }
        if !manifest.complete {
            info!("Cached outcomes come from a cancelled run; cache is stale");
            return Ok(None);
        }

        let outcomes = self.outcomes.load()?;
        info!("Loaded {} cached outcomes", outcomes.len());
        Ok(Some(outcomes))
    }

    /// Every cached outcome, regardless of the manifest.
    pub fn load(&self) -> Result<Vec<NormalizedOutcome>, StorageError> {
        self.outcomes.load()
    }

    /// Drop the cache before a new extraction.
    pub fn reset(&self) -> Result<(), StorageError> {
        self.outcomes.clear()?;
        if self.manifest_path.exists() {
            fs::remove_file(&self.manifest_path)?;
        }
        Ok(())
    }

    /// Add outcomes of one game file.
    pub fn append(&self, outcomes: &[NormalizedOutcome]) -> Result<usize, StorageError> {
        self.outcomes.append(outcomes)
    }

    /// Record what the cache now holds.
    pub fn finish(&self, manifest: &CacheManifest) -> Result<(), StorageError> {
        if let Some(parent) = self.manifest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.manifest_path, serde_json::to_string_pretty(manifest)?)?;
        info!(
            "Cached {} outcomes from {} files (fingerprint {})",
            manifest.outcomes,
            manifest.files.len(),
            manifest.fingerprint
        );
        Ok(())
    }
}
