//! Records: the unit the pipeline generates, persists and serves.
//!
//! A record pairs a generated text with the sentiment it was *asked* to carry
//! and the sentiment it was *scored* as carrying. The two are independent and
//! frequently disagree; that disagreement is the point of the dataset.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, sentiment};

// ─── Labels ──────────────────────────────────────────────────────────────────

/// The sentiment a generation was asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedSentiment {
  Positive,
  Negative,
  Neutral,
  Aggressive,
}

impl RequestedSentiment {
  /// Every label, in the order the dataset builder walks them.
  pub const ALL: [Self; 4] =
    [Self::Positive, Self::Negative, Self::Neutral, Self::Aggressive];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Positive => "positive",
      Self::Negative => "negative",
      Self::Neutral => "neutral",
      Self::Aggressive => "aggressive",
    }
  }
}

impl fmt::Display for RequestedSentiment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RequestedSentiment {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "positive" => Ok(Self::Positive),
      "negative" => Ok(Self::Negative),
      "neutral" => Ok(Self::Neutral),
      "aggressive" => Ok(Self::Aggressive),
      other => Err(Error::UnknownRequestedSentiment(other.to_owned())),
    }
  }
}

/// The sentiment derived from a polarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatedSentiment {
  Positive,
  Negative,
  Neutral,
}

impl CalculatedSentiment {
  /// The only valid score → label mapping: the sign of the score.
  pub fn from_score(score: i32) -> Self {
    match score.signum() {
      1 => Self::Positive,
      -1 => Self::Negative,
      _ => Self::Neutral,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Positive => "positive",
      Self::Negative => "negative",
      Self::Neutral => "neutral",
    }
  }
}

impl fmt::Display for CalculatedSentiment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CalculatedSentiment {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "positive" => Ok(Self::Positive),
      "negative" => Ok(Self::Negative),
      "neutral" => Ok(Self::Neutral),
      other => Err(Error::UnknownCalculatedSentiment(other.to_owned())),
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A record that has been built but not yet persisted.
///
/// There is no calculated-sentiment field: the label is always derived from
/// `score`, so a stored record can never disagree with its own score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
  pub topic:               String,
  pub text:                String,
  pub requested_sentiment: RequestedSentiment,
  pub score:               i32,
}

impl NewRecord {
  /// Build a record from a generated text, scoring it on the way in.
  pub fn scored(
    topic: impl Into<String>,
    requested_sentiment: RequestedSentiment,
    text: impl Into<String>,
  ) -> Self {
    let text = text.into();
    let (score, _) = sentiment::score(&text);
    Self { topic: topic.into(), text, requested_sentiment, score }
  }

  pub fn calculated_sentiment(&self) -> CalculatedSentiment {
    CalculatedSentiment::from_score(self.score)
  }
}

/// A persisted record. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
  pub id:                   Uuid,
  pub created_at:           DateTime<Utc>,
  pub topic:                String,
  pub text:                 String,
  pub requested_sentiment:  RequestedSentiment,
  pub calculated_sentiment: CalculatedSentiment,
  pub score:                i32,
}
