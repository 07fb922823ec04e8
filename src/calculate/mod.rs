//! Statistics calculation engine.
//!
//! Computes bucketed statistics from normalized outcomes:
//! - Streaming moments (mean, variance, skewness, kurtosis)
//! - Bucket keys for the primary and secondary tables
//! - Sequential and sharded aggregation into accumulator banks

pub mod aggregate;
pub mod keys;
pub mod moments;

pub use aggregate::{aggregate, aggregate_parallel, AccumulatorBank, BankError, Metric};
pub use keys::{derive_key, primary_key, secondary_key, BucketKey, InvalidBucketInput, KeyVariant};
pub use moments::Moments;
