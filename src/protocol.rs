//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{ErrorDetails, QuizData, QuizSource, SourcedQuiz};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOut {
  pub ok: bool,
  pub generator: bool,
}

/// `POST /quiz` response. Always sent with HTTP 200.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
  pub ok: bool,
  pub quiz: QuizData,
  pub source: QuizSource,
  pub request_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_details: Option<ErrorDetails>,
}

impl QuizOut {
  pub fn new(sourced: SourcedQuiz, request_id: String) -> Self {
    Self {
      ok: true,
      quiz: sourced.quiz,
      source: sourced.source,
      request_id,
      error_details: sourced.error_details,
    }
  }
}

/// One picked option. Answer keys never come from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
  pub question_id: String,
  #[serde(default)]
  pub selected_answer: Option<String>,
}

/// `POST /quiz/attempts` body. `requestId` is the one returned by `POST /quiz`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttemptIn {
  #[validate(length(min = 1, max = 64, message = "requestId must not be empty"))]
  pub request_id: String,
  #[validate(length(min = 1, max = 128, message = "userId must not be empty"))]
  pub user_id: String,
  #[validate(length(min = 1, max = 50, message = "an attempt needs between 1 and 50 answers"))]
  pub answers: Vec<AnswerIn>,
}
