//! SQL schema for the polarinch SQLite store.
//!
//! Executed once at connection startup. There is no migration machinery;
//! `PRAGMA user_version` records the layout for whoever adds one.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Records are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- `seq` defines insertion order, which the distinct-topic sample relies on.
CREATE TABLE IF NOT EXISTS records (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id            TEXT    NOT NULL UNIQUE,
    created_at           TEXT    NOT NULL,   -- ISO 8601 UTC; store-assigned
    topic                TEXT    NOT NULL,
    text                 TEXT    NOT NULL,
    requested_sentiment  TEXT    NOT NULL,   -- positive | negative | neutral | aggressive
    calculated_sentiment TEXT    NOT NULL,   -- positive | negative | neutral
    score                INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS records_topic_idx ON records(topic, seq);

PRAGMA user_version = 1;
";
