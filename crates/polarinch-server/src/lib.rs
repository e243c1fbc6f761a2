//! Composition root for polarinch: configuration, the generation pipeline and
//! its scheduler, and the outer HTTP router that wraps the read API.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{Pipeline, PipelineError, RunReport};

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Json, Router,
  http::StatusCode,
  response::IntoResponse,
  routing::get,
};
use config::{ConfigError, Environment, Source};
use polarinch_core::store::RecordStore;
use polarinch_generate::ClientConfig;
use serde::Deserialize;
use serde_json::json;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "0.0.0.0".to_owned() }

const fn default_port() -> u16 { 5000 }

fn default_store_path() -> PathBuf { PathBuf::from("polarinch.sqlite3") }

fn default_topics() -> Vec<String> {
  ["nba", "motogp", "formula 1", "bitcoin"]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const fn default_schedule_interval_secs() -> u64 { 3600 }

const fn default_run_on_start() -> bool { true }

/// Runtime configuration, deserialised from `config.toml` and `POLARINCH_*`
/// environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  /// SQLite database file. A leading `~/` is expanded by the binary.
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  /// Subjects covered by every generation run, in order.
  #[serde(default = "default_topics")]
  pub topics:                 Vec<String>,
  #[serde(default = "default_schedule_interval_secs")]
  pub schedule_interval_secs: u64,
  /// Run the pipeline immediately at startup instead of after one interval.
  #[serde(default = "default_run_on_start")]
  pub run_on_start:           bool,
  #[serde(default)]
  pub generation:             ClientConfig,
}

impl ServerConfig {
  /// Load from the TOML file at `path` (optional), then overlay the
  /// environment.
  ///
  /// Nested keys use a double underscore, e.g.
  /// `POLARINCH_GENERATION__API_KEY`. `POLARINCH_TOPICS` takes a
  /// comma-separated list.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_sources(config::File::from(path).required(false), environment())
  }

  fn from_sources<F>(file: F, env: Environment) -> Result<Self, ConfigError>
  where
    F: Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(env)
      .build()?
      .try_deserialize()
  }
}

fn environment() -> Environment {
  Environment::with_prefix("POLARINCH")
    .prefix_separator("_")
    .separator("__")
    .list_separator(",")
    .with_list_parse_key("topics")
    .try_parsing(true)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the public router: the read API under `/api`, a health probe, JSON
/// 404 and 405 responses, all behind permissive CORS and request tracing.
///
/// The CORS layer answers every `OPTIONS` request itself.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: RecordStore + 'static,
{
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods(Any)
    .allow_headers(Any);

  Router::new()
    .nest("/api", polarinch_api::api_router(store))
    .route("/health", get(health))
    .method_not_allowed_fallback(polarinch_api::tweets::method_not_allowed)
    .fallback(not_found)
    .layer(cors)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse { Json(json!({ "status": "healthy" })) }

async fn not_found() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })))
}
