//! Core types and trait definitions for the polarinch dataset pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Generation backends, storage backends and the API layer all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dataset;
pub mod error;
pub mod generate;
pub mod record;
pub mod sampling;
pub mod sentiment;
pub mod store;

mod lexicon;

pub use error::{Error, Result};
