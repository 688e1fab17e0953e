//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Decoding a quiz request body into `INVALID_JSON` / `INVALID_PAYLOAD` rejections
//!   - Running the sourcing chain on its own task with cooperative cancellation
//!   - Remembering each served quiz and scoring attempts against it

use std::collections::HashMap;

use tracing::{error, info, instrument, warn};

use crate::corpus::fetch_corpus;
use crate::domain::{ErrorDetails, QuizRequest, SourcedQuiz, MIXED_FORMAT};
use crate::error::SourcingError;
use crate::history::{NewAttempt, ServedQuiz};
use crate::protocol::{AttemptIn, QuizOut};
use crate::sourcing::Cancellation;
use crate::state::AppState;

/// Why a quiz request body was refused before sourcing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizRejection {
  InvalidJson(String),
  InvalidPayload(String),
}

impl QuizRejection {
  pub fn details(&self) -> ErrorDetails {
    match self {
      QuizRejection::InvalidJson(e) => ErrorDetails {
        message: "Request body is not valid JSON; served a fallback quiz.".into(),
        original_error: Some(e.clone()),
        code: "INVALID_JSON".into(),
      },
      QuizRejection::InvalidPayload(e) => ErrorDetails {
        message: "Request body failed validation; served a fallback quiz.".into(),
        original_error: Some(e.clone()),
        code: "INVALID_PAYLOAD".into(),
      },
    }
  }
}

/// Decode the body. Schema checks beyond the shape happen in the coordinator.
pub fn parse_quiz_request(body: &[u8]) -> Result<QuizRequest, QuizRejection> {
  let value: serde_json::Value =
    serde_json::from_slice(body).map_err(|e| QuizRejection::InvalidJson(e.to_string()))?;
  serde_json::from_value(value).map_err(|e| QuizRejection::InvalidPayload(e.to_string()))
}

/// Mixed-category corpus quiz tagged with the rejection reason.
pub fn rejected_quiz(rejection: &QuizRejection, count: usize) -> SourcedQuiz {
  SourcedQuiz::fallback(fetch_corpus(MIXED_FORMAT, count), Some(rejection.details()))
}

/// Full `/quiz` flow. Never fails: every path ends in a playable quiz.
#[instrument(level = "info", skip(state, body, request_id), fields(%request_id, body_len = body.len()))]
pub async fn serve_quiz(state: &AppState, body: &[u8], request_id: String) -> QuizOut {
  let count = state.sourcer.question_count();

  let request = match parse_quiz_request(body) {
    Ok(r) => r,
    Err(rejection) => {
      warn!(target: "quiz", ?rejection, "Rejected quiz request body");
      return QuizOut::new(rejected_quiz(&rejection, count), request_id);
    }
  };

  // The chain runs on its own task; dropping `_guard` (client gone) stops it at the next tier.
  let (_guard, cancel) = Cancellation::new();
  let sourcer = state.sourcer.clone();
  let task = tokio::spawn({
    let request = request.clone();
    async move { sourcer.source_quiz(&request, &cancel).await }
  });

  let sourced = match task.await {
    Ok(Ok(sourced)) => sourced,
    Ok(Err(SourcingError::InvalidRequest(e))) => {
      warn!(target: "quiz", format = %request.format, user_id = %request.user_id, error = %e, "Invalid quiz request");
      return QuizOut::new(rejected_quiz(&QuizRejection::InvalidPayload(e), count), request_id);
    }
    // `_guard` is only dropped together with this future, so nobody is left to read this arm.
    Ok(Err(SourcingError::Cancelled)) => internal_fallback(&request.format, count, "sourcing cancelled"),
    Err(e) => internal_fallback(&request.format, count, &e.to_string()),
  };

  let user_id = request.user_id.trim();
  if !user_id.is_empty() {
    if let Err(e) = state.attempts.remember_quiz(&request_id, user_id, &request.format, &sourced.quiz.questions).await {
      warn!(target: "quiz", %user_id, error = %e, "Could not store served quiz; attempts on it will be refused");
    }
  }

  info!(target: "quiz", source = ?sourced.source, n = sourced.quiz.questions.len(), "Quiz served");
  QuizOut::new(sourced, request_id)
}

fn internal_fallback(format: &str, count: usize, cause: &str) -> SourcedQuiz {
  error!(target: "quiz", %format, %cause, "Sourcing task failed; serving corpus fallback");
  SourcedQuiz::fallback(
    fetch_corpus(format, count),
    Some(ErrorDetails {
      message: "Internal error; served a fallback quiz.".into(),
      original_error: Some(cause.to_string()),
      code: "INTERNAL".into(),
    }),
  )
}

/// Score an attempt against the quiz as it was served. Answers to questions that were
/// not served are ignored; unanswered questions count as wrong.
pub fn score_attempt(served: &ServedQuiz, attempt: &AttemptIn) -> NewAttempt {
  let picks: HashMap<&str, &str> = attempt
    .answers
    .iter()
    .filter_map(|a| a.selected_answer.as_deref().map(|s| (a.question_id.as_str(), s)))
    .collect();

  let score = served
    .questions
    .iter()
    .filter(|q| picks.get(q.id.as_str()) == Some(&q.correct_answer.as_str()))
    .count() as i64;

  NewAttempt {
    request_id: served.request_id.clone(),
    user_id: served.user_id.clone(),
    format: served.format.clone(),
    question_texts: served.questions.iter().map(|q| q.question.clone()).collect(),
    score,
    total: served.questions.len() as i64,
  }
}
