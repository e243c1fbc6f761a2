//! The distinct-topic sampling algorithm.
//!
//! Sampling happens in two stages:
//!
//! 1. Each topic is represented by its *first* record in insertion order.
//!    This pick is deterministic.
//! 2. A uniformly random subset of `k` representatives is drawn without
//!    replacement. Only this stage is random.
//!
//! Backends may do stage 1 natively (e.g. with a `GROUP BY`) and call
//! [`sample`] for stage 2.

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};

use crate::record::Record;

/// Keep the first record of every topic. `records` must be in insertion
/// order; the output keeps that order.
pub fn first_per_topic(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
  let mut seen = HashSet::new();
  records
    .into_iter()
    .filter(|record| seen.insert(record.topic.clone()))
    .collect()
}

/// Draw `k` items uniformly at random without replacement. Returns every item
/// (in random order) when there are `k` or fewer.
pub fn sample<T, R>(mut candidates: Vec<T>, k: usize, rng: &mut R) -> Vec<T>
where
  R: Rng + ?Sized,
{
  candidates.shuffle(rng);
  candidates.truncate(k);
  candidates
}

/// Both stages over an in-memory, insertion-ordered record list.
pub fn sample_distinct_topics<R>(
  records: impl IntoIterator<Item = Record>,
  k: usize,
  rng: &mut R,
) -> Vec<Record>
where
  R: Rng + ?Sized,
{
  sample(first_per_topic(records), k, rng)
}
