//! Handlers for the tweet read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tweets` | `?topic=<topic>`; missing or malformed topic yields no results |
//! | `GET`  | `/random-tweets` | Up to [`RANDOM_SAMPLE_SIZE`] records, one per topic |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use polarinch_core::{record::Record, store::RecordStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// How many records `GET /random-tweets` asks for.
pub const RANDOM_SAMPLE_SIZE: usize = 6;

/// Response envelope shared by both endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Results {
  pub results: Vec<Record>,
}

// ─── By topic ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TopicParams {
  pub topic: Option<String>,
}

/// `GET /tweets?topic=<topic>`
///
/// A missing, empty or unparseable `topic` is answered with an empty result
/// set rather than a client error.
pub async fn by_topic<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<TopicParams>, QueryRejection>,
) -> Result<Json<Results>, ApiError>
where
  S: RecordStore,
{
  let topic = match params {
    Ok(Query(TopicParams { topic: Some(topic) })) if !topic.is_empty() => topic,
    Ok(_) => return Ok(Json(Results::default())),
    Err(rejection) => {
      tracing::debug!(%rejection, "ignoring malformed topic query");
      return Ok(Json(Results::default()));
    }
  };

  let results = store
    .find_by_topic(&topic)
    .await
    .map_err(ApiError::store("Error retrieving tweets for topic"))?;
  Ok(Json(Results { results }))
}

// ─── Random ───────────────────────────────────────────────────────────────────

/// `GET /random-tweets`
pub async fn random<S>(State(store): State<Arc<S>>) -> Result<Json<Results>, ApiError>
where
  S: RecordStore,
{
  let results = store
    .sample_distinct_topics(RANDOM_SAMPLE_SIZE)
    .await
    .map_err(ApiError::store("Error retrieving random tweets"))?;
  Ok(Json(Results { results }))
}

// ─── Method handling ──────────────────────────────────────────────────────────

/// `OPTIONS` on any API route: success, no body.
///
/// Only reached when [`api_router`](crate::api_router) is served on its own.
/// Behind a `tower_http::cors::CorsLayer` every `OPTIONS` request is answered
/// by the layer and never gets here.
pub async fn options() -> axum::http::StatusCode { axum::http::StatusCode::OK }

/// Any method other than `GET` or `OPTIONS` on a known route.
pub async fn method_not_allowed() -> impl axum::response::IntoResponse {
  (
    axum::http::StatusCode::METHOD_NOT_ALLOWED,
    Json(serde_json::json!({ "error": "Method not allowed" })),
  )
}
