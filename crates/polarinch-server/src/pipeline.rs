//! One generation run: build the dataset, then persist it.

use std::sync::Arc;

use polarinch_core::{dataset::build_dataset, generate::Generator, store::RecordStore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("persisting dataset failed: {0}")]
  Persist(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
  /// Matrix cells attempted (topics × labels).
  pub cells:     usize,
  pub generated: usize,
  pub skipped:   usize,
  pub inserted:  usize,
}

/// The write path: generator and store, plus the topics to cover.
pub struct Pipeline<G, S> {
  generator: G,
  store:     Arc<S>,
  topics:    Vec<String>,
}

impl<G, S> Pipeline<G, S>
where
  G: Generator,
  S: RecordStore,
{
  pub fn new(generator: G, store: Arc<S>, topics: Vec<String>) -> Self {
    Self { generator, store, topics }
  }

  pub fn topics(&self) -> &[String] { &self.topics }

  /// Generate the full matrix and persist whatever succeeded as one batch.
  ///
  /// Generation failures are absorbed per cell; only a persistence failure
  /// fails the run.
  pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
    let dataset = build_dataset(&self.generator, &self.topics).await;
    let cells = dataset.cells();
    let generated = dataset.records.len();
    let skipped = dataset.failures.len();

    let inserted = self
      .store
      .persist(dataset.records)
      .await
      .map_err(|e| PipelineError::Persist(Box::new(e)))?;

    Ok(RunReport { cells, generated, skipped, inserted })
  }
}

#[cfg(test)]
mod tests {
  use std::io;

  use polarinch_core::{
    record::{NewRecord, Record, RequestedSentiment},
    store::RecordStore,
  };
  use polarinch_store_sqlite::SqliteStore;

  use super::*;

  /// Fails every cell whose label is `aggressive`.
  struct NoAggression;

  impl Generator for NoAggression {
    type Error = io::Error;

    async fn generate(
      &self,
      topic: &str,
      sentiment: RequestedSentiment,
    ) -> Result<String, io::Error> {
      match sentiment {
        RequestedSentiment::Aggressive => Err(io::Error::other("content filtered")),
        _ => Ok(format!("a {sentiment} take on {topic}")),
      }
    }
  }

  struct ReadOnlyStore;

  impl RecordStore for ReadOnlyStore {
    type Error = io::Error;

    async fn persist(&self, _records: Vec<NewRecord>) -> io::Result<usize> {
      Err(io::Error::other("read-only"))
    }

    async fn find_by_topic(&self, _topic: &str) -> io::Result<Vec<Record>> { Ok(Vec::new()) }

    async fn sample_distinct_topics(&self, _k: usize) -> io::Result<Vec<Record>> {
      Ok(Vec::new())
    }

    async fn count(&self) -> io::Result<usize> { Ok(0) }
  }

  #[tokio::test]
  async fn run_persists_successful_cells_and_reports_skips() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let pipeline = Pipeline::new(
      NoAggression,
      store.clone(),
      vec!["nba".into(), "bitcoin".into()],
    );

    let report = pipeline.run_once().await.unwrap();
    assert_eq!(
      report,
      RunReport { cells: 8, generated: 6, skipped: 2, inserted: 6 }
    );
    assert_eq!(store.count().await.unwrap(), 6);
    assert_eq!(store.find_by_topic("bitcoin").await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn persistence_failure_fails_the_run() {
    let pipeline = Pipeline::new(NoAggression, Arc::new(ReadOnlyStore), vec!["nba".into()]);
    let err = pipeline.run_once().await.unwrap_err();
    assert!(err.to_string().contains("read-only"));
  }

  #[tokio::test]
  async fn no_topics_inserts_nothing() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let pipeline = Pipeline::new(NoAggression, store.clone(), Vec::new());
    let report = pipeline.run_once().await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(store.count().await.unwrap(), 0);
  }
}
