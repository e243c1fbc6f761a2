//! The single failure kind for a generation call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("invalid generation input: {0}")]
  InvalidInput(String),

  #[error("generation request timed out")]
  Timeout,

  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("rate limited by generation service")]
  RateLimited,

  #[error("generation service returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("malformed generation response: {0}")]
  Malformed(String),

  #[error("generation service returned no text")]
  Empty,
}

impl GenerationError {
  /// Whether a later attempt might succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Timeout | Self::Transport(_) | Self::RateLimited => true,
      Self::Status { status, .. } => *status >= 500,
      Self::InvalidInput(_) | Self::Malformed(_) | Self::Empty => false,
    }
  }
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      Self::Timeout
    } else if e.is_decode() {
      Self::Malformed(e.to_string())
    } else {
      Self::Transport(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retryable_classification() {
    assert!(GenerationError::Timeout.is_retryable());
    assert!(GenerationError::RateLimited.is_retryable());
    assert!(GenerationError::Status { status: 503, body: String::new() }.is_retryable());
    assert!(!GenerationError::Status { status: 401, body: String::new() }.is_retryable());
    assert!(!GenerationError::Malformed("x".into()).is_retryable());
    assert!(!GenerationError::Empty.is_retryable());
    assert!(!GenerationError::InvalidInput("x".into()).is_retryable());
  }
}
