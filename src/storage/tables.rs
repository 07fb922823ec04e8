//! Published bucket tables: `{bucket_key: [score, margin]}`, pretty
//! printed with sorted keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::info;

use super::StorageError;
use crate::calculate::{AccumulatorBank, BucketKey, KeyVariant, Metric, Moments};

/// Write a bank as a table file, creating parent directories.
pub fn write_table(path: &Path, bank: &AccumulatorBank) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(bank.table())?;
    fs::write(path, json)?;

    info!(
        "Wrote {} {} buckets ({} outcomes) to {:?}",
        bank.len(),
        bank.variant(),
        bank.total_count(),
        path
    );
    Ok(())
}

/// Load a table file back into a bank so it can be merged with new data.
pub fn read_table(
    path: &Path,
    variant: KeyVariant,
    metrics: &[Metric],
) -> Result<AccumulatorBank, StorageError> {
    if !path.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    let table: BTreeMap<BucketKey, Vec<Moments>> = serde_json::from_str(&contents)?;
    Ok(AccumulatorBank::from_table(variant, metrics, table)?)
}
