//! Error types for `polarinch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown requested sentiment: {0:?}")]
  UnknownRequestedSentiment(String),

  #[error("unknown calculated sentiment: {0:?}")]
  UnknownCalculatedSentiment(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
