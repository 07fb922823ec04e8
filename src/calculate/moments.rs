//! Streaming central moments (mean, variance, skewness, kurtosis).
//!
//! Single-pass update after Welford/Terriberry and the pairwise merge of
//! Pébay (2008). `m2..m4` are sums of powers of deviations from the mean,
//! not normalized by the count.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulated moments of a scalar stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    n: u64,
    m1: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl Moments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the five serialized values.
    pub fn from_parts(n: u64, m1: f64, m2: f64, m3: f64, m4: f64) -> Self {
        Self { n, m1, m2, m3, m4 }
    }

    /// Accumulate a whole sample.
    pub fn from_samples(samples: impl IntoIterator<Item = f64>) -> Self {
        let mut m = Self::new();
        for x in samples {
            m.update(x);
        }
        m
    }

    /// Fold one sample in.
    pub fn update(&mut self, x: f64) {
        let n1 = self.n as f64;
        self.n += 1;
        let n = self.n as f64;

        let delta = x - self.m1;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.m1 += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
    }

    /// Combine with moments of a disjoint sample.
    pub fn merge(&mut self, other: &Moments) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = *other;
            return;
        }

        let na = self.n as f64;
        let nb = other.n as f64;
        let n = na + nb;

        let delta = other.m1 - self.m1;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta2 * delta2;

        let m1 = (na * self.m1 + nb * other.m1) / n;
        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        *self = Self {
            n: self.n + other.n,
            m1,
            m2,
            m3,
            m4,
        };
    }

    /// Merged copy of two accumulators.
    pub fn merged(mut self, other: &Moments) -> Self {
        self.merge(other);
        self
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Raw accumulators `(n, M1, M2, M3, M4)`.
    pub fn parts(&self) -> (u64, f64, f64, f64, f64) {
        (self.n, self.m1, self.m2, self.m3, self.m4)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.n > 0).then_some(self.m1)
    }

    /// Population variance (divides by n).
    pub fn variance(&self) -> Option<f64> {
        (self.n > 1).then(|| self.m2 / self.n as f64)
    }

    /// Sample variance (divides by n - 1).
    pub fn sample_variance(&self) -> Option<f64> {
        (self.n > 1).then(|| self.m2 / (self.n - 1) as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Population skewness. Undefined for constant samples.
    pub fn skewness(&self) -> Option<f64> {
        if self.n < 2 || self.m2 == 0.0 {
            return None;
        }
        Some((self.n as f64).sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Excess kurtosis (normal = 0). Undefined for constant samples.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.n < 2 || self.m2 == 0.0 {
            return None;
        }
        Some(self.n as f64 * self.m4 / (self.m2 * self.m2) - 3.0)
    }
}

impl Extend<f64> for Moments {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for x in iter {
            self.update(x);
        }
    }
}

/// A single sample is written as its bare value; anything else as the
/// tuple `[n, M1, M2, M3, M4]`.
impl Serialize for Moments {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.n == 1 {
            return serializer.serialize_f64(self.m1);
        }
        let mut tuple = serializer.serialize_tuple(5)?;
        tuple.serialize_element(&self.n)?;
        tuple.serialize_element(&self.m1)?;
        tuple.serialize_element(&self.m2)?;
        tuple.serialize_element(&self.m3)?;
        tuple.serialize_element(&self.m4)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Moments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MomentsVisitor)
    }
}

struct MomentsVisitor;

impl MomentsVisitor {
    fn single(value: f64) -> Moments {
        Moments::from_parts(1, value, 0.0, 0.0, 0.0)
    }
}

impl<'de> Visitor<'de> for MomentsVisitor {
    type Value = Moments;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or an array [n, M1, M2, M3, M4]")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Moments, E> {
        Ok(Self::single(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Moments, E> {
        Ok(Self::single(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Moments, E> {
        Ok(Self::single(v as f64))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Moments, A::Error> {
        let n: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let mut m = [0.0; 4];
        for (i, slot) in m.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i + 1, &self))?;
        }
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(6, &self));
        }
        Ok(Moments::from_parts(n, m[0], m[1], m[2], m[3]))
    }
}
