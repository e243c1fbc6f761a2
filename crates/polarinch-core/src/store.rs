//! The `RecordStore` trait.
//!
//! Implemented by storage backends (e.g. `polarinch-store-sqlite`). The
//! scheduler and the API layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::record::{NewRecord, Record};

/// Abstraction over a polarinch record store backend.
///
/// Records are append-only: there is no update or delete. All methods return
/// `Send` futures so the trait can be used from multi-threaded runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `records` as one batch and return how many were inserted.
  ///
  /// An empty batch is a no-op returning `0`. A failure aborts the whole
  /// batch; no partial write is reported as success.
  fn persist(
    &self,
    records: Vec<NewRecord>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Every record whose topic equals `topic`, in insertion order.
  ///
  /// An empty topic, or a topic with no records, yields an empty vec.
  fn find_by_topic<'a>(
    &'a self,
    topic: &'a str,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// At most `k` records, each from a different topic.
  ///
  /// The record standing in for a topic is always that topic's first record
  /// in insertion order; only the choice of topics is random. See
  /// [`crate::sampling`].
  fn sample_distinct_topics(
    &self,
    k: usize,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// Total number of persisted records.
  fn count(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
