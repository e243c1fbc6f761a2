//! [`OpenAiClient`]: a [`Generator`] over an OpenAI-compatible chat
//! completions API.

use std::time::Duration;

use polarinch_core::{generate::Generator, record::RequestedSentiment};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{GenerationError, RetryPolicy};

const SYSTEM_PROMPT: &str =
  "You are a helpful assistant that generates tweets with specified sentiments.";

/// Longest slice of an error body kept in [`GenerationError::Status`].
const MAX_ERROR_BODY: usize = 512;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_base_url() -> String { "https://api.openai.com/v1".to_owned() }

fn default_model() -> String { "gpt-4".to_owned() }

const fn default_max_tokens() -> u32 { 50 }

const fn default_timeout_secs() -> u64 { 30 }

const fn default_max_retries() -> u32 { 2 }

const fn default_retry_base_delay_ms() -> u64 { 500 }

/// Connection and request settings for the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// Bearer token. Sent only when non-empty.
  #[serde(default)]
  pub api_key:             String,
  #[serde(default = "default_base_url")]
  pub base_url:            String,
  #[serde(default = "default_model")]
  pub model:               String,
  /// Upper bound on the length of each generated text, in tokens.
  #[serde(default = "default_max_tokens")]
  pub max_tokens:          u32,
  /// Per-request timeout.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:        u64,
  /// Retries after the first attempt, for retryable failures only.
  #[serde(default = "default_max_retries")]
  pub max_retries:         u32,
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_key:             String::new(),
      base_url:            default_base_url(),
      model:               default_model(),
      max_tokens:          default_max_tokens(),
      timeout_secs:        default_timeout_secs(),
      max_retries:         default_max_retries(),
      retry_base_delay_ms: default_retry_base_delay_ms(),
    }
  }
}

impl ClientConfig {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_retries: self.max_retries,
      base_delay:  Duration::from_millis(self.retry_base_delay_ms),
    }
  }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
  model:      &'a str,
  messages:   [ChatMessage<'a>; 2],
  max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

/// The part of a chat completion response we rely on. Anything missing here
/// is a [`GenerationError::Malformed`].
#[derive(Deserialize)]
struct ChatCompletion {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// The user prompt sent for one matrix cell.
pub fn prompt(topic: &str, sentiment: RequestedSentiment) -> String {
  format!("Generate a {sentiment} tweet about {topic}.")
}

/// Generation client for an OpenAI-compatible API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. Makes
/// exactly one request per [`generate`](Generator::generate) call; wrap it
/// in [`Retrying`](crate::Retrying) for retries.
#[derive(Clone)]
pub struct OpenAiClient {
  client: Client,
  config: ClientConfig,
}

impl OpenAiClient {
  pub fn new(config: ClientConfig) -> Result<Self, GenerationError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(GenerationError::Transport)?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.api_key.is_empty() {
      req
    } else {
      req.bearer_auth(&self.config.api_key)
    }
  }
}

impl Generator for OpenAiClient {
  type Error = GenerationError;

  async fn generate(
    &self,
    topic: &str,
    sentiment: RequestedSentiment,
  ) -> Result<String, GenerationError> {
    if topic.trim().is_empty() {
      return Err(GenerationError::InvalidInput("topic is empty".to_owned()));
    }

    let user_prompt = prompt(topic, sentiment);
    let request = ChatRequest {
      model:      &self.config.model,
      messages:   [
        ChatMessage { role: "system", content: SYSTEM_PROMPT },
        ChatMessage { role: "user", content: &user_prompt },
      ],
      max_tokens: self.config.max_tokens,
    };

    let resp = self
      .auth(self.client.post(self.url("/chat/completions")))
      .json(&request)
      .send()
      .await?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(GenerationError::RateLimited);
    }

    let body = resp.text().await?;
    if !status.is_success() {
      let body = body.chars().take(MAX_ERROR_BODY).collect();
      return Err(GenerationError::Status { status: status.as_u16(), body });
    }

    let completion: ChatCompletion = serde_json::from_str(&body)
      .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let content = completion
      .choices
      .into_iter()
      .next()
      .ok_or_else(|| GenerationError::Malformed("response has no choices".to_owned()))?
      .message
      .content
      .unwrap_or_default();

    let text = content.trim();
    if text.is_empty() {
      return Err(GenerationError::Empty);
    }
    Ok(text.to_owned())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Json, Router, http::StatusCode, routing::post};
  use serde_json::{Value, json};

  use super::*;

  /// Serve `router` on an ephemeral port and return its base URL.
  async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/v1")
  }

  fn client(base_url: String) -> OpenAiClient {
    OpenAiClient::new(ClientConfig {
      api_key: "test-key".into(),
      base_url,
      timeout_secs: 1,
      ..Default::default()
    })
    .unwrap()
  }

  fn completion(content: &str) -> Value {
    json!({
      "id": "chatcmpl-1",
      "object": "chat.completion",
      "choices": [
        { "index": 0, "message": { "role": "assistant", "content": content } }
      ]
    })
  }

  #[test]
  fn prompt_names_label_and_topic() {
    assert_eq!(
      prompt("formula 1", RequestedSentiment::Aggressive),
      "Generate a aggressive tweet about formula 1."
    );
  }

  #[tokio::test]
  async fn returns_trimmed_text_and_sends_typed_request() {
    let seen: Arc<Mutex<Option<(Value, Option<String>)>>> = Arc::default();
    let captured = seen.clone();
    let router = Router::new().route(
      "/v1/chat/completions",
      post(move |headers: axum::http::HeaderMap, Json(body): Json<Value>| {
        let captured = captured.clone();
        async move {
          let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
          *captured.lock().unwrap() = Some((body, auth));
          Json(completion("  LeBron is unstoppable tonight!  \n"))
        }
      }),
    );
    let generator = client(serve(router).await);

    let text = generator
      .generate("nba", RequestedSentiment::Positive)
      .await
      .unwrap();
    assert_eq!(text, "LeBron is unstoppable tonight!");

    let (body, auth) = seen.lock().unwrap().take().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["max_tokens"], 50);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Generate a positive tweet about nba.");
  }

  #[tokio::test]
  async fn rate_limit_is_reported() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let err = client(serve(router).await)
      .generate("nba", RequestedSentiment::Neutral)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::RateLimited));
  }

  #[tokio::test]
  async fn server_error_carries_status() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    );
    let err = client(serve(router).await)
      .generate("nba", RequestedSentiment::Neutral)
      .await
      .unwrap_err();
    assert!(
      matches!(err, GenerationError::Status { status: 502, ref body } if body == "upstream down")
    );
    assert!(err.is_retryable());
  }

  #[tokio::test]
  async fn shape_mismatch_fails_fast() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { Json(json!({ "result": "no choices field" })) }),
    );
    let err = client(serve(router).await)
      .generate("bitcoin", RequestedSentiment::Negative)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
    assert!(!err.is_retryable());
  }

  #[tokio::test]
  async fn no_choices_is_malformed() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { Json(json!({ "choices": [] })) }),
    );
    let err = client(serve(router).await)
      .generate("bitcoin", RequestedSentiment::Negative)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
  }

  #[tokio::test]
  async fn blank_content_is_empty() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { Json(completion("   ")) }),
    );
    let err = client(serve(router).await)
      .generate("motogp", RequestedSentiment::Neutral)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::Empty));
  }

  #[tokio::test]
  async fn slow_service_times_out() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        Json(completion("too late"))
      }),
    );
    let err = client(serve(router).await)
      .generate("motogp", RequestedSentiment::Neutral)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::Timeout), "got {err:?}");
  }

  #[tokio::test]
  async fn empty_topic_is_rejected_without_a_request() {
    // Nothing listens here; a request would fail with a transport error.
    let generator = client("http://127.0.0.1:9/v1".into());
    let err = generator
      .generate("  ", RequestedSentiment::Positive)
      .await
      .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidInput(_)));
  }
}
