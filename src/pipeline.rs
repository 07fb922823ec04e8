//! Pipeline runner.
//!
//! Coordinates a statistics run:
//! 1. Find the game files and check the outcome cache
//! 2. Ingest games file by file (writing monthly tables on the way)
//! 3. Aggregate outcomes under both key variants
//! 4. Write the bucket tables

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::calculate::{
    aggregate_parallel, derive_key, AccumulatorBank, BankError, KeyVariant, Metric,
};
use crate::config::AppConfig;
use crate::ingest::{CancelToken, ExclusionList, IngestReport, Ingestor};
use crate::models::NormalizedOutcome;
use crate::ratings::{RatingsLookup, RatingsTable};
use crate::storage::{
    fingerprint_files, list_game_files, monthly_table_name, read_games, write_table,
    CacheManifest, OutcomeCache, StorageConfig, StorageError,
};

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Aggregation error: {0}")]
    Bank(#[from] BankError),

    #[error("No game files in {0}")]
    NoGames(PathBuf),
}

/// Outcomes of an ingestion step and where they came from.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub outcomes: Vec<NormalizedOutcome>,
    pub report: IngestReport,
    pub from_cache: bool,
}

/// Summary of one written table.
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub variant: KeyVariant,
    pub path: PathBuf,
    pub buckets: usize,
    pub outcomes: u64,
    pub skipped: usize,
}

/// One diagnostic row per outcome: game, faction, primary key, VP, margin
/// and the scoring tile of rounds 1 to 6.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRow {
    pub game_id: String,
    pub faction: String,
    pub key: String,
    pub vp: i64,
    pub margin: f64,
    pub score_tiles: [Option<u32>; 6],
}

impl ExplainRow {
    pub const HEADER: &'static str = "game_id,faction,result_key,vp,margin,R1,R2,R3,R4,R5,R6";

    pub fn to_csv(&self) -> String {
        let tiles: Vec<String> = self
            .score_tiles
            .iter()
            .map(|t| t.map(|id| id.to_string()).unwrap_or_default())
            .collect();
        format!(
            "{},{},{},{},{},{}",
            self.game_id,
            self.faction,
            self.key,
            self.vp,
            self.margin,
            tiles.join(",")
        )
    }
}

pub struct Pipeline {
    config: AppConfig,
    storage: StorageConfig,
    exclusions: ExclusionList,
    ratings: Box<dyn RatingsLookup>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Set up a run from configuration; ratings are loaded from
    /// `ratings_path` (an unreadable file means every player is unrated).
    pub fn new(config: AppConfig, cancel: CancelToken) -> Self {
        let ratings = RatingsTable::load_or_empty(&config.ratings_path);
        Self::with_ratings(config, cancel, ratings)
    }

    pub fn with_ratings(
        config: AppConfig,
        cancel: CancelToken,
        ratings: impl RatingsLookup + 'static,
    ) -> Self {
        let storage = StorageConfig::new(config.data_dir.clone())
            .with_games_dir(config.games_dir.clone())
            .with_output_dir(config.output_dir.clone());
        let exclusions = config.exclusions.to_list();
        Self {
            config,
            storage,
            exclusions,
            ratings: Box::new(ratings),
            cancel,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Ingest, aggregate and write both tables.
    pub fn run(&self, refresh: bool) -> Result<Vec<TableSummary>, PipelineError> {
        let ingested = self.ingest(refresh)?;
        self.compute_from(&ingested.outcomes)
    }

    /// Outcomes of every game file, from the cache when it is fresh.
    pub fn ingest(&self, refresh: bool) -> Result<Ingested, PipelineError> {
        let files = list_game_files(&self.storage.games_dir)?;
        if files.is_empty() {
            return Err(PipelineError::NoGames(self.storage.games_dir.clone()));
        }
        let fingerprint = fingerprint_files(&files)?;
        let cache = OutcomeCache::new(&self.storage);

        if !refresh {
            if let Some(outcomes) = cache.load_if_fresh(&fingerprint)? {
                let report = cache.manifest()?.map(|m| m.report).unwrap_or_default();
                return Ok(Ingested {
                    outcomes,
                    report,
                    from_cache: true,
                });
            }
        }

        cache.reset()?;
        let mut ingestor = Ingestor::new(self.exclusions.clone(), self.cancel.clone());
        let mut outcomes = Vec::new();
        let mut names = Vec::with_capacity(files.len());

        for path in &files {
            if ingestor.is_cancelled() {
                break;
            }
            let games = match read_games(path) {
                Ok(games) => games,
                Err(e) => {
                    warn!("Skipping game file {:?}: {}", path, e);
                    continue;
                }
            };

            let from_file = ingestor.ingest_all(games);
            cache.append(&from_file)?;

            if !ingestor.is_cancelled() {
                self.write_monthly_table(path, &from_file)?;
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
            outcomes.extend(from_file);
        }

        let report = ingestor.into_report();
        let complete = !report.cancelled && !self.cancel.is_cancelled();
        if !complete {
            warn!(
                "Run cancelled after {} games; continuing with {} outcomes",
                report.games_seen,
                outcomes.len()
            );
        }
        info!(
            "Ingested {} games: {} admitted, {} rejected, {} participants dropped",
            report.games_seen,
            report.games_admitted,
            report.games_rejected(),
            report.participants_dropped
        );

        cache.finish(&CacheManifest {
            fingerprint,
            files: names,
            outcomes: outcomes.len(),
            complete,
            created_at: Utc::now(),
            report: report.clone(),
        })?;

        Ok(Ingested {
            outcomes,
            report,
            from_cache: false,
        })
    }

    /// Aggregate the cached outcomes and write both tables.
    pub fn compute(&self) -> Result<Vec<TableSummary>, PipelineError> {
        let outcomes = OutcomeCache::new(&self.storage).load()?;
        if outcomes.is_empty() {
            warn!("Outcome cache is empty; run `ingest` first");
        }
        self.compute_from(&outcomes)
    }

    fn compute_from(
        &self,
        outcomes: &[NormalizedOutcome],
    ) -> Result<Vec<TableSummary>, PipelineError> {
        let mut summaries = Vec::new();
        for variant in [KeyVariant::Primary, KeyVariant::Secondary] {
            let bank = self.aggregate(outcomes, variant)?;
            let path = self.storage.table_path(variant);
            write_table(&path, &bank)?;
            summaries.push(TableSummary {
                variant,
                path,
                buckets: bank.len(),
                outcomes: bank.total_count(),
                skipped: bank.skipped(),
            });
        }
        Ok(summaries)
    }

    fn aggregate(
        &self,
        outcomes: &[NormalizedOutcome],
        variant: KeyVariant,
    ) -> Result<AccumulatorBank, BankError> {
        aggregate_parallel(
            outcomes,
            variant,
            &Metric::TABLE,
            self.ratings.as_ref(),
            self.config.aggregate.threads,
        )
    }

    /// Primary table for one monthly game file, written once.
    fn write_monthly_table(
        &self,
        path: &std::path::Path,
        outcomes: &[NormalizedOutcome],
    ) -> Result<(), PipelineError> {
        if !self.config.aggregate.monthly_tables {
            return Ok(());
        }
        let Some(name) = monthly_table_name(path) else {
            return Ok(());
        };
        let target = self.storage.monthly_table_path(&name);
        if target.exists() {
            return Ok(());
        }
        let bank = self.aggregate(outcomes, KeyVariant::Primary)?;
        write_table(&target, &bank)?;
        Ok(())
    }

    /// Diagnostic rows for every admitted outcome, optionally for one game.
    pub fn explain(&self, game: Option<&str>) -> Result<Vec<ExplainRow>, PipelineError> {
        let files = list_game_files(&self.storage.games_dir)?;
        let mut ingestor = Ingestor::new(self.exclusions.clone(), self.cancel.clone());
        let mut rows = Vec::new();

        for path in &files {
            if ingestor.is_cancelled() {
                break;
            }
            let games = read_games(path)?
                .into_iter()
                .filter(|g| game.map_or(true, |id| g.game == id));
            for outcome in ingestor.ingest_all(games) {
                match derive_key(&outcome, KeyVariant::Primary, self.ratings.as_ref()) {
                    Ok(key) => rows.push(explain_row(&outcome, key.into_string())),
                    Err(e) => warn!("No key for {} in {}: {}", outcome.faction, outcome.game_id, e),
                }
            }
        }
        Ok(rows)
    }
}

fn explain_row(outcome: &NormalizedOutcome, key: String) -> ExplainRow {
    let mut score_tiles = [None; 6];
    for (i, slot) in score_tiles.iter_mut().enumerate() {
        *slot = outcome.score_tile(i as u8 + 1);
    }
    ExplainRow {
        game_id: outcome.game_id.clone(),
        faction: outcome.faction.to_string(),
        key,
        vp: outcome.vp(),
        margin: outcome.margin,
        score_tiles,
    }
}
