//! The `Generator` trait, the seam to an external text-generation service.
//!
//! Implemented by `polarinch-generate`. The dataset builder depends on this
//! abstraction only.

use std::future::Future;

use crate::record::RequestedSentiment;

/// Produces a short text about `topic` that is meant to carry `sentiment`.
///
/// One call is one outbound request. Implementations report every failure
/// (transport, timeout, rate limit, malformed response) through
/// [`Generator::Error`]; whether to retry, skip or abort is the caller's call.
pub trait Generator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn generate<'a>(
    &'a self,
    topic: &'a str,
    sentiment: RequestedSentiment,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
