//! JSON read API for the polarinch dataset.
//!
//! Exposes an axum [`Router`] backed by any
//! [`polarinch_core::store::RecordStore`]. CORS, tracing and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", polarinch_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod tweets;

use std::sync::Arc;

use axum::{Router, routing::get};
use polarinch_core::store::RecordStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  Router::new()
    .route("/tweets", get(tweets::by_topic::<S>).options(tweets::options))
    .route(
      "/random-tweets",
      get(tweets::random::<S>).options(tweets::options),
    )
    .method_not_allowed_fallback(tweets::method_not_allowed)
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, io};

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use polarinch_core::record::{NewRecord, Record, RequestedSentiment};
  use polarinch_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  use super::*;
  use crate::tweets::Results;

  fn rec(topic: &str, score: i32) -> NewRecord {
    NewRecord {
      topic:               topic.into(),
      text:                format!("about {topic}"),
      requested_sentiment: RequestedSentiment::Positive,
      score,
    }
  }

  async fn seeded(records: Vec<NewRecord>) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.persist(records).await.unwrap();
    Arc::new(store)
  }

  async fn call<S>(store: Arc<S>, method: &str, uri: &str) -> (StatusCode, Vec<u8>)
  where
    S: RecordStore + 'static,
  {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .body(Body::empty())
      .unwrap();
    let resp = api_router(store).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
  }

  fn results(bytes: &[u8]) -> Vec<Record> {
    serde_json::from_slice::<Results>(bytes).unwrap().results
  }

  /// A store whose every call fails with an internal-looking error.
  struct BrokenStore;

  impl RecordStore for BrokenStore {
    type Error = io::Error;

    async fn persist(&self, _records: Vec<NewRecord>) -> io::Result<usize> {
      Err(io::Error::other("disk on fire at /var/lib/secret.db"))
    }

    async fn find_by_topic(&self, _topic: &str) -> io::Result<Vec<Record>> {
      Err(io::Error::other("disk on fire at /var/lib/secret.db"))
    }

    async fn sample_distinct_topics(&self, _k: usize) -> io::Result<Vec<Record>> {
      Err(io::Error::other("disk on fire at /var/lib/secret.db"))
    }

    async fn count(&self) -> io::Result<usize> {
      Err(io::Error::other("disk on fire at /var/lib/secret.db"))
    }
  }

  // ── /tweets ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn tweets_by_topic_returns_matches_only() {
    let store = seeded(vec![rec("nba", 2), rec("nba", -1), rec("bitcoin", 0)]).await;

    let (status, body) = call(store.clone(), "GET", "/tweets?topic=nba").await;
    assert_eq!(status, StatusCode::OK);
    let nba = results(&body);
    assert_eq!(nba.len(), 2);
    assert!(nba.iter().all(|r| r.topic == "nba"));

    let (status, body) = call(store, "GET", "/tweets?topic=golf").await;
    assert_eq!(status, StatusCode::OK);
    assert!(results(&body).is_empty());
  }

  #[tokio::test]
  async fn tweets_topic_is_url_decoded() {
    let store = seeded(vec![rec("formula 1", 1), rec("nba", 1)]).await;
    let (status, body) = call(store, "GET", "/tweets?topic=formula%201").await;
    assert_eq!(status, StatusCode::OK);
    let found = results(&body);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].topic, "formula 1");
  }

  #[tokio::test]
  async fn tweets_without_topic_is_empty_200() {
    let store = seeded(vec![rec("nba", 2)]).await;
    let (status, body) = call(store, "GET", "/tweets").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "results": [] }));
  }

  #[tokio::test]
  async fn tweets_with_empty_or_repeated_topic_is_empty_200() {
    let store = seeded(vec![rec("nba", 2)]).await;

    let (status, body) = call(store.clone(), "GET", "/tweets?topic=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(results(&body).is_empty());

    let (status, body) = call(store, "GET", "/tweets?topic=nba&topic=golf").await;
    assert_eq!(status, StatusCode::OK);
    assert!(results(&body).is_empty());
  }

  #[tokio::test]
  async fn tweets_store_failure_is_generic_500() {
    let (status, body) = call(Arc::new(BrokenStore), "GET", "/tweets?topic=nba").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Error retrieving tweets for topic");
    assert!(!String::from_utf8_lossy(&body).contains("secret"));
  }

  #[tokio::test]
  async fn tweets_records_use_wire_field_names() {
    let store = seeded(vec![rec("nba", -4)]).await;
    let (_, body) = call(store, "GET", "/tweets?topic=nba").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    let first = &json["results"][0];
    assert_eq!(first["topic"], "nba");
    assert_eq!(first["requestedSentiment"], "positive");
    assert_eq!(first["calculatedSentiment"], "negative");
    assert_eq!(first["score"], -4);
    assert!(first["id"].is_string());
    assert!(first["createdAt"].is_string());
  }

  // ── /random-tweets ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn random_tweets_clamps_to_topic_count() {
    let store = seeded(vec![
      rec("nba", 1),
      rec("motogp", 1),
      rec("formula 1", 1),
      rec("bitcoin", 1),
      rec("nba", 2),
    ])
    .await;
    let (status, body) = call(store, "GET", "/random-tweets").await;
    assert_eq!(status, StatusCode::OK);
    let sample = results(&body);
    assert_eq!(sample.len(), 4);
    let topics: HashSet<_> = sample.iter().map(|r| r.topic.as_str()).collect();
    assert_eq!(topics.len(), 4);
  }

  #[tokio::test]
  async fn random_tweets_returns_at_most_six_distinct_topics() {
    let topics = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
    let store = seeded(topics.iter().map(|t| rec(t, 0)).collect()).await;
    let (status, body) = call(store, "GET", "/random-tweets").await;
    assert_eq!(status, StatusCode::OK);
    let sample = results(&body);
    assert_eq!(sample.len(), tweets::RANDOM_SAMPLE_SIZE);
    let distinct: HashSet<_> = sample.iter().map(|r| r.topic.clone()).collect();
    assert_eq!(distinct.len(), sample.len());
  }

  #[tokio::test]
  async fn random_tweets_on_empty_store() {
    let store = seeded(Vec::new()).await;
    let (status, body) = call(store, "GET", "/random-tweets").await;
    assert_eq!(status, StatusCode::OK);
    assert!(results(&body).is_empty());
  }

  #[tokio::test]
  async fn random_tweets_store_failure_is_generic_500() {
    let (status, body) = call(Arc::new(BrokenStore), "GET", "/random-tweets").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({ "message": "Error retrieving random tweets" }));
  }

  // ── OPTIONS ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn options_is_ok_with_empty_body() {
    for uri in ["/tweets", "/random-tweets"] {
      let (status, body) = call(Arc::new(BrokenStore), "OPTIONS", uri).await;
      assert_eq!(status, StatusCode::OK, "{uri}");
      assert!(body.is_empty(), "{uri}");
    }
  }

  #[tokio::test]
  async fn other_methods_are_json_405() {
    for (method, uri) in [
      ("POST", "/tweets"),
      ("DELETE", "/random-tweets"),
      ("PUT", "/tweets?topic=nba"),
    ] {
      let (status, body) = call(Arc::new(BrokenStore), method, uri).await;
      assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
      let json: Value = serde_json::from_slice(&body).unwrap();
      assert_eq!(
        json,
        serde_json::json!({ "error": "Method not allowed" }),
        "{method} {uri}"
      );
    }
  }
}
