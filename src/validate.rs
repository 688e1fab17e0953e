//! Output validation for generator payloads.
//!
//! Strict pass first: a `questions` array with at least `count` valid items.
//! Salvage pass second: any questions-like array, keeping only the items that stand on their own.

use serde_json::Value;

use crate::domain::{QuizData, QuizQuestion};
use crate::error::ValidationFailed;

/// Keys the salvage pass looks under, in order.
const SALVAGE_KEYS: &[&str] = &["questions", "facts", "quiz", "items"];

pub const OPTION_COUNT: usize = 4;

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
  /// Matched the quiz shape outright (possibly truncated to `count`).
  Strict(Vec<QuizQuestion>),
  /// Recovered from a malformed payload; may hold fewer than `count` items.
  Salvaged(Vec<QuizQuestion>),
}

impl Validated {
  pub fn questions(&self) -> &[QuizQuestion] {
    match self {
      Validated::Strict(q) | Validated::Salvaged(q) => q,
    }
  }

  pub fn into_questions(self) -> Vec<QuizQuestion> {
    match self {
      Validated::Strict(q) | Validated::Salvaged(q) => q,
    }
  }

  pub fn is_salvaged(&self) -> bool {
    matches!(self, Validated::Salvaged(_))
  }
}

/// Item-level shape check shared by every tier.
pub fn check_question(q: &QuizQuestion) -> Result<(), String> {
  if q.id.trim().is_empty() {
    return Err("missing id".into());
  }
  if q.question.trim().is_empty() {
    return Err(format!("question {} has no text", q.id));
  }
  if q.options.len() != OPTION_COUNT {
    return Err(format!("question {} has {} options, expected {}", q.id, q.options.len(), OPTION_COUNT));
  }
  if q.options.iter().any(|o| o.trim().is_empty()) {
    return Err(format!("question {} has an empty option", q.id));
  }
  if !q.options.contains(&q.correct_answer) {
    return Err(format!("question {} correctAnswer is not among its options", q.id));
  }
  Ok(())
}

pub fn validate_quiz(candidate: &Value, count: usize) -> Result<Validated, ValidationFailed> {
  let strict_reason = match strict(candidate, count) {
    Ok(questions) => return Ok(Validated::Strict(questions)),
    Err(reason) => reason,
  };

  let salvaged = salvage(candidate, count);
  if salvaged.is_empty() {
    return Err(ValidationFailed { reason: strict_reason });
  }
  tracing::debug!(target: "quiz", kept = salvaged.len(), %strict_reason, "Salvaged partial generator output");
  Ok(Validated::Salvaged(salvaged))
}

fn strict(candidate: &Value, count: usize) -> Result<Vec<QuizQuestion>, String> {
  let data: QuizData = serde_json::from_value(candidate.clone()).map_err(|e| format!("not a quiz object: {e}"))?;
  for q in &data.questions {
    check_question(q)?;
  }
  if data.questions.len() < count {
    return Err(format!("{} questions returned, {} requested", data.questions.len(), count));
  }
  let mut questions = data.questions;
  questions.truncate(count);
  Ok(questions)
}

fn salvage(candidate: &Value, count: usize) -> Vec<QuizQuestion> {
  let items = match candidate {
    Value::Array(items) => Some(items),
    Value::Object(map) => SALVAGE_KEYS.iter().find_map(|k| map.get(*k).and_then(Value::as_array)),
    _ => None,
  };
  let Some(items) = items else { return Vec::new() };

  items
    .iter()
    .filter_map(|item| serde_json::from_value::<QuizQuestion>(item.clone()).ok())
    .filter(|q| check_question(q).is_ok())
    .take(count)
    .collect()
}
