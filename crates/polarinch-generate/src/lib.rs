//! Text generation for the polarinch pipeline.
//!
//! [`OpenAiClient`] talks to an OpenAI-compatible chat completions endpoint,
//! one request per call. [`Retrying`] wraps any such generator with a bounded
//! exponential-backoff retry policy.

mod client;
mod error;
mod retry;

pub use client::{ClientConfig, OpenAiClient};
pub use error::GenerationError;
pub use retry::{RetryPolicy, Retrying};
