//! Domain models: quiz questions, the uniform quiz shape, provenance and the sourcing request.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Category every unknown or undersized format falls back to.
pub const MIXED_FORMAT: &str = "mixed";

/// Number of questions in a quiz unless configured otherwise.
pub const DEFAULT_QUESTION_COUNT: usize = 5;

/// One multiple-choice question. `correct_answer` is always one of `options`
/// once it has passed through the validator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub id: String,
  pub question: String,
  pub options: Vec<String>,
  #[serde(alias = "correct_answer")]
  pub correct_answer: String,
  pub explanation: String,
}

/// Uniform quiz shape produced by every tier.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizData {
  pub questions: Vec<QuizQuestion>,
}

/// Where did the questions come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuizSource {
  Ai,       // generator output that passed validation
  Fallback, // persisted pool or static corpus
}

/// Why the chain fell back. Describes the cause; never signals request failure.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_error: Option<String>,
  pub code: String,
}

/// Result handed back by the sourcing coordinator.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourcedQuiz {
  pub quiz: QuizData,
  pub source: QuizSource,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_details: Option<ErrorDetails>,
}

impl SourcedQuiz {
  pub fn ai(questions: Vec<QuizQuestion>) -> Self {
    Self { quiz: QuizData { questions }, source: QuizSource::Ai, error_details: None }
  }

  pub fn fallback(questions: Vec<QuizQuestion>, details: Option<ErrorDetails>) -> Self {
    Self { quiz: QuizData { questions }, source: QuizSource::Fallback, error_details: details }
  }
}

/// Caller input for one quiz. Rejected before any tier runs when invalid.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
  #[validate(length(min = 1, max = 40, message = "format must be between 1 and 40 characters"))]
  pub format: String,
  #[validate(length(min = 1, max = 128, message = "userId must not be empty"))]
  pub user_id: String,
}

/// Lowercased, trimmed format key used by the pool and the corpus.
pub fn normalize_format(format: &str) -> String {
  format.trim().to_lowercase()
}
