//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings and sentiment labels as their lowercase names.

use chrono::{DateTime, Utc};
use polarinch_core::record::Record;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, created_at, topic, text, \
                                  requested_sentiment, calculated_sentiment, score";

/// A `records` row exactly as read from SQLite, before decoding.
pub struct RawRecord {
  pub record_id:            String,
  pub created_at:           String,
  pub topic:                String,
  pub text:                 String,
  pub requested_sentiment:  String,
  pub calculated_sentiment: String,
  pub score:                i32,
}

impl RawRecord {
  /// Read a row selected with [`RECORD_COLUMNS`] (optionally prefixed).
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:            row.get(0)?,
      created_at:           row.get(1)?,
      topic:                row.get(2)?,
      text:                 row.get(3)?,
      requested_sentiment:  row.get(4)?,
      calculated_sentiment: row.get(5)?,
      score:                row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      id:                   decode_uuid(&self.record_id)?,
      created_at:           decode_dt(&self.created_at)?,
      topic:                self.topic,
      text:                 self.text,
      requested_sentiment:  self.requested_sentiment.parse()?,
      calculated_sentiment: self.calculated_sentiment.parse()?,
      score:                self.score,
    })
  }
}
