//! Bounded retry with exponential backoff around a [`Generator`].

use std::time::Duration;

use polarinch_core::{generate::Generator, record::RequestedSentiment};

use crate::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first attempt. `0` disables retrying.
  pub max_retries: u32,
  /// Delay before the first retry; doubled for every retry after that.
  pub base_delay:  Duration,
}

impl RetryPolicy {
  pub fn none() -> Self { Self { max_retries: 0, base_delay: Duration::ZERO } }

  /// Delay before retry number `retry` (0-based).
  pub fn delay(&self, retry: u32) -> Duration {
    self.base_delay.saturating_mul(2u32.saturating_pow(retry))
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_retries: 2, base_delay: Duration::from_millis(500) }
  }
}

/// Retries retryable [`GenerationError`]s from the inner generator according
/// to a [`RetryPolicy`]. Non-retryable errors are returned immediately.
#[derive(Clone)]
pub struct Retrying<G> {
  inner:  G,
  policy: RetryPolicy,
}

impl<G> Retrying<G> {
  pub fn new(inner: G, policy: RetryPolicy) -> Self { Self { inner, policy } }
}

impl<G> Generator for Retrying<G>
where
  G: Generator<Error = GenerationError>,
{
  type Error = GenerationError;

  async fn generate(
    &self,
    topic: &str,
    sentiment: RequestedSentiment,
  ) -> Result<String, GenerationError> {
    let mut retry = 0;
    loop {
      match self.inner.generate(topic, sentiment).await {
        Ok(text) => return Ok(text),
        Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
          let delay = self.policy.delay(retry);
          tracing::debug!(
            topic,
            requested = %sentiment,
            retry = retry + 1,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "retrying generation"
          );
          tokio::time::sleep(delay).await;
          retry += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  /// Pops one scripted outcome per call; succeeds once the script runs out.
  struct Flaky {
    script: Mutex<Vec<GenerationError>>,
    calls:  AtomicU32,
  }

  impl Flaky {
    fn new(mut failures: Vec<GenerationError>) -> Self {
      failures.reverse();
      Self { script: Mutex::new(failures), calls: AtomicU32::new(0) }
    }
  }

  impl Generator for Flaky {
    type Error = GenerationError;

    async fn generate(
      &self,
      _topic: &str,
      _sentiment: RequestedSentiment,
    ) -> Result<String, GenerationError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      match self.script.lock().unwrap().pop() {
        Some(e) => Err(e),
        None => Ok("finally".to_owned()),
      }
    }
  }

  fn fast(max_retries: u32) -> RetryPolicy {
    RetryPolicy { max_retries, base_delay: Duration::from_millis(1) }
  }

  #[test]
  fn backoff_doubles() {
    let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(100) };
    assert_eq!(policy.delay(0), Duration::from_millis(100));
    assert_eq!(policy.delay(1), Duration::from_millis(200));
    assert_eq!(policy.delay(2), Duration::from_millis(400));
  }

  #[tokio::test]
  async fn recovers_after_transient_failures() {
    let g = Retrying::new(
      Flaky::new(vec![GenerationError::Timeout, GenerationError::RateLimited]),
      fast(2),
    );
    let text = g.generate("nba", RequestedSentiment::Positive).await.unwrap();
    assert_eq!(text, "finally");
    assert_eq!(g.inner.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_max_retries() {
    let g = Retrying::new(
      Flaky::new(vec![
        GenerationError::Timeout,
        GenerationError::Timeout,
        GenerationError::Timeout,
      ]),
      fast(2),
    );
    let err = g.generate("nba", RequestedSentiment::Positive).await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout));
    assert_eq!(g.inner.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn non_retryable_error_is_returned_immediately() {
    let g = Retrying::new(
      Flaky::new(vec![GenerationError::Malformed("bad shape".into())]),
      fast(2),
    );
    let err = g.generate("nba", RequestedSentiment::Positive).await.unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
    assert_eq!(g.inner.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn zero_retries_means_single_attempt() {
    let g = Retrying::new(Flaky::new(vec![GenerationError::Timeout]), RetryPolicy::none());
    assert!(g.generate("nba", RequestedSentiment::Positive).await.is_err());
    assert_eq!(g.inner.calls.load(Ordering::SeqCst), 1);
  }
}
