//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use polarinch_core::{
  record::{NewRecord, Record},
  sampling,
  store::RecordStore,
};

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Open one
/// store at process start, share clones, and [`close`](Self::close) it at
/// shutdown.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection. Other clones of this store fail every
  /// subsequent call.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection; lets tests plant triggers.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// An encoded `records` row ready for insertion.
struct InsertRow {
  record_id:            String,
  topic:                String,
  text:                 String,
  requested_sentiment:  &'static str,
  calculated_sentiment: &'static str,
  score:                i32,
}

impl InsertRow {
  fn encode(record: NewRecord) -> Self {
    Self {
      record_id:            encode_uuid(Uuid::new_v4()),
      requested_sentiment:  record.requested_sentiment.as_str(),
      calculated_sentiment: record.calculated_sentiment().as_str(),
      score:                record.score,
      topic:                record.topic,
      text:                 record.text,
    }
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  async fn persist(&self, records: Vec<NewRecord>) -> Result<usize> {
    if records.is_empty() {
      return Ok(0);
    }

    let created_at = encode_dt(Utc::now());
    let rows: Vec<InsertRow> = records.into_iter().map(InsertRow::encode).collect();

    // One transaction per batch: if any row fails, dropping `tx` without
    // committing rolls back every row inserted before it.
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO records (
               record_id, created_at, topic, text,
               requested_sentiment, calculated_sentiment, score
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for row in &rows {
            inserted += stmt.execute(rusqlite::params![
              row.record_id,
              created_at,
              row.topic,
              row.text,
              row.requested_sentiment,
              row.calculated_sentiment,
              row.score,
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    tracing::debug!(inserted, "persisted record batch");
    Ok(inserted)
  }

  async fn find_by_topic(&self, topic: &str) -> Result<Vec<Record>> {
    if topic.is_empty() {
      return Ok(Vec::new());
    }
    let topic = topic.to_owned();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records WHERE topic = ?1 ORDER BY seq"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![topic], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn sample_distinct_topics(&self, k: usize) -> Result<Vec<Record>> {
    if k == 0 {
      return Ok(Vec::new());
    }

    // Stage 1 in SQL: each topic's first record by insertion order.
    let raws: Vec<RawRecord> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE seq IN (SELECT MIN(seq) FROM records GROUP BY topic)
           ORDER BY seq"
        ))?;
        let rows = stmt
          .query_map([], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let candidates = raws
      .into_iter()
      .map(RawRecord::into_record)
      .collect::<Result<Vec<_>>>()?;

    // Stage 2: uniform random subset of the representatives.
    Ok(sampling::sample(candidates, k, &mut rand::rng()))
  }

  async fn count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?)
      })
      .await?;
    Ok(usize::try_from(n).unwrap_or_default())
  }
}
