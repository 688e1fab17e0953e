//! Minimal generative-AI client for quiz generation.
//!
//! Speaks the OpenAI-compatible `chat/completions` protocol, which Google's Gemini API also
//! exposes; the default base URL points there. Calls are instrumented and log the model,
//! latency and token usage (not contents).
//!
//! The API key is never logged; error bodies and bad outputs are truncated before logging.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::error::GenerationError;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// What the generator is asked for.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
  pub format: String,
  pub recent_questions: Vec<String>,
  pub count: usize,
}

/// The external quiz generator. Returns the raw candidate; validation happens elsewhere.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
  async fn generate_quiz(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

#[derive(Clone)]
pub struct GenAi {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

impl GenAi {
  pub fn new(api_key: String, base_url: String, model: String, prompts: Prompts) -> Result<Self, GenerationError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, prompts })
  }

  /// Construct the client if we find GENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("GENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

    match Self::new(api_key, base_url, model, prompts) {
      Ok(client) => Some(client),
      Err(e) => {
        error!(target: "indcric_backend", error = %e, "Failed to build generator HTTP client");
        None
      }
    }
  }

  /// JSON-object chat completion; returns the parsed JSON value of the first choice.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, GenerationError> {
    let payload = CompletionRequest {
      model: &self.model,
      messages: [Turn { role: "system", content: system }, Turn { role: "user", content: user }],
      temperature,
      response_format: JsonMode { kind: "json_object" },
    };

    let res = self.client.post(format!("{}/chat/completions", self.base_url))
      .header(USER_AGENT, "indcric-backend/0.1")
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await?;

    let status = res.status();
    if !status.is_success() {
      let raw = res.text().await.unwrap_or_default();
      let message = extract_api_error(&raw).unwrap_or_else(|| trunc_for_log(&raw, 200));
      return Err(GenerationError::Http { status: status.as_u16(), message });
    }

    let completion: CompletionResponse = res.json().await?;
    if let Some(u) = &completion.usage {
      info!(prompt_tokens = ?u.prompt_tokens, completion_tokens = ?u.completion_tokens, "Generator usage");
    }
    let content = completion.choices.into_iter().find_map(|c| c.message.content).unwrap_or_default();
    let text = strip_code_fences(&content);
    if text.is_empty() {
      return Err(GenerationError::EmptyResponse);
    }

    serde_json::from_str::<Value>(text)
      .map_err(|e| GenerationError::Unparseable(format!("{e}; output: {}", trunc_for_log(text, 120))))
  }
}

#[async_trait]
impl QuizGenerator for GenAi {
  #[instrument(
    level = "info",
    skip(self, request),
    fields(format = %request.format, count = request.count, recent = request.recent_questions.len())
  )]
  async fn generate_quiz(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
    let count = request.count.to_string();
    let recent = if request.recent_questions.is_empty() {
      "(none)".to_string()
    } else {
      request.recent_questions.iter().map(|q| format!("- {q}")).collect::<Vec<_>>().join("\n")
    };
    let pairs = [("format", request.format.as_str()), ("count", count.as_str()), ("recent_questions", recent.as_str())];
    let system = fill_template(&self.prompts.quiz_system, &pairs);
    let user = fill_template(&self.prompts.quiz_user_template, &pairs);

    let start = Instant::now();
    let result = self.chat_json(&system, &user, 0.9).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(_) => info!(?elapsed, "Quiz candidate received"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during quiz generation"),
    }
    result
  }
}

// Wire types for the chat/completions call.

#[derive(Serialize)]
struct CompletionRequest<'a> {
  model: &'a str,
  messages: [Turn<'a>; 2],
  temperature: f32,
  response_format: JsonMode,
}

#[derive(Serialize)]
struct Turn<'a> {
  role: &'static str,
  content: &'a str,
}

#[derive(Serialize)]
struct JsonMode {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
  #[serde(default)]
  choices: Vec<Choice>,
  usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
  message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
  content: Option<String>,
}

#[derive(Deserialize)]
struct TokenUsage {
  prompt_tokens: Option<u32>,
  completion_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
/// Gemini's compatibility layer wraps errors in a one-element array.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct Envelope {
    error: ApiError,
  }
  #[derive(Deserialize)]
  struct ApiError {
    message: String,
  }
  if let Ok(env) = serde_json::from_str::<Envelope>(body) {
    return Some(env.error.message);
  }
  serde_json::from_str::<Vec<Envelope>>(body).ok()?.into_iter().next().map(|env| env.error.message)
}
