//! Aggregation of outcomes into per-bucket moments.
//!
//! Every outcome is keyed, then each configured metric is folded into the
//! bucket's accumulators. Moments merge exactly, so records can be split
//! into shards, aggregated on their own and merged in any order.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::keys::{derive_key, BucketKey, KeyVariant};
use super::moments::Moments;
use crate::models::NormalizedOutcome;
use crate::ratings::RatingsLookup;

/// Errors combining banks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Cannot merge a {right} bank into a {left} bank")]
    VariantMismatch { left: KeyVariant, right: KeyVariant },

    #[error("Banks track different metrics: {left:?} vs {right:?}")]
    MetricMismatch {
        left: Vec<Metric>,
        right: Vec<Metric>,
    },

    #[error("Bucket {key} has {found} accumulators, expected {expected}")]
    BucketShape {
        key: String,
        found: usize,
        expected: usize,
    },
}

/// Per-outcome value folded into a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Final score (VP plus baseline)
    Score,
    /// Score minus the table average
    Margin,
}

impl Metric {
    /// Metrics of the published tables, in column order.
    pub const TABLE: [Metric; 2] = [Metric::Score, Metric::Margin];

    pub fn value(&self, outcome: &NormalizedOutcome) -> f64 {
        match self {
            Metric::Score => outcome.score as f64,
            Metric::Margin => outcome.margin,
        }
    }
}

/// Bucket key to one accumulator per metric. A bank only ever holds keys of
/// one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorBank {
    variant: KeyVariant,
    metrics: Vec<Metric>,
    buckets: BTreeMap<BucketKey, Vec<Moments>>,
    skipped: usize,
}

impl AccumulatorBank {
    pub fn new(variant: KeyVariant, metrics: &[Metric]) -> Self {
        Self {
            variant,
            metrics: metrics.to_vec(),
            buckets: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Rebuild a bank from a stored table.
    pub fn from_table(
        variant: KeyVariant,
        metrics: &[Metric],
        table: BTreeMap<BucketKey, Vec<Moments>>,
    ) -> Result<Self, BankError> {
        if let Some((key, row)) = table.iter().find(|(_, row)| row.len() != metrics.len()) {
            return Err(BankError::BucketShape {
                key: key.to_string(),
                found: row.len(),
                expected: metrics.len(),
            });
        }
        Ok(Self {
            variant,
            metrics: metrics.to_vec(),
            buckets: table,
            skipped: 0,
        })
    }

    pub fn variant(&self) -> KeyVariant {
        self.variant
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Outcomes left out for lack of key data.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, key: &str) -> Option<&[Moments]> {
        self.buckets
            .get(&BucketKey::new(key))
            .map(Vec::as_slice)
    }

    /// Accumulator of one metric in one bucket.
    pub fn moments(&self, key: &str, metric: Metric) -> Option<&Moments> {
        let column = self.metrics.iter().position(|m| *m == metric)?;
        self.get(key)?.get(column)
    }

    /// The bucket table as written to disk.
    pub fn table(&self) -> &BTreeMap<BucketKey, Vec<Moments>> {
        &self.buckets
    }

    /// Outcomes counted across all buckets.
    pub fn total_count(&self) -> u64 {
        self.buckets
            .values()
            .filter_map(|row| row.first())
            .map(Moments::count)
            .sum()
    }

    /// Fold an outcome into the bucket for `key`.
    pub fn record(&mut self, key: BucketKey, outcome: &NormalizedOutcome) {
        let width = self.metrics.len();
        let row = self
            .buckets
            .entry(key)
            .or_insert_with(|| vec![Moments::new(); width]);
        for (acc, metric) in row.iter_mut().zip(&self.metrics) {
            acc.update(metric.value(outcome));
        }
    }

    /// Merge another bank in, bucket by bucket.
    pub fn merge(&mut self, other: AccumulatorBank) -> Result<(), BankError> {
        if self.variant != other.variant {
            return Err(BankError::VariantMismatch {
                left: self.variant,
                right: other.variant,
            });
        }
        if self.metrics != other.metrics {
            return Err(BankError::MetricMismatch {
                left: self.metrics.clone(),
                right: other.metrics,
            });
        }

        for (key, row) in other.buckets {
            match self.buckets.get_mut(&key) {
                Some(mine) => {
                    for (acc, theirs) in mine.iter_mut().zip(&row) {
                        acc.merge(theirs);
                    }
                }
                None => {
                    self.buckets.insert(key, row);
                }
            }
        }
        self.skipped += other.skipped;
        Ok(())
    }
}

/// Aggregate outcomes sequentially. Outcomes missing key data are skipped
/// with a warning.
pub fn aggregate<'a, I>(
    records: I,
    variant: KeyVariant,
    metrics: &[Metric],
    ratings: &dyn RatingsLookup,
) -> AccumulatorBank
where
    I: IntoIterator<Item = &'a NormalizedOutcome>,
{
    let mut bank = AccumulatorBank::new(variant, metrics);
    for outcome in records {
        match derive_key(outcome, variant, ratings) {
            Ok(key) => bank.record(key, outcome),
            Err(e) => {
                warn!(faction = %outcome.faction, "Skipping outcome: {}", e);
                bank.skipped += 1;
            }
        }
    }
    bank
}

/// Aggregate shards of the records on a rayon pool of `threads` workers;
/// each shard fills a private bank and the banks are merged pairwise.
pub fn aggregate_parallel(
    records: &[NormalizedOutcome],
    variant: KeyVariant,
    metrics: &[Metric],
    ratings: &dyn RatingsLookup,
    threads: usize,
) -> Result<AccumulatorBank, BankError> {
    if threads <= 1 || records.len() < 2 {
        return Ok(aggregate(records, variant, metrics, ratings));
    }

    let shard = records.len().div_ceil(threads).max(1);
    debug!(
        "Aggregating {} outcomes in shards of {} on {} threads",
        records.len(),
        shard,
        threads
    );

    with_pool(threads, || {
        records
            .par_chunks(shard)
            .map(|chunk| Ok::<_, BankError>(aggregate(chunk, variant, metrics, ratings)))
            .try_reduce(
                || AccumulatorBank::new(variant, metrics),
                |mut left, right| {
                    left.merge(right)?;
                    Ok(left)
                },
            )
    })
}

fn with_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(e) => {
            warn!("Could not start {} aggregation threads: {}", threads, e);
            action()
        }
    }
}
