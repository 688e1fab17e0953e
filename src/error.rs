//! Error types for every tier of the quiz pipeline plus the HTTP-facing `AppError`.
//!
//! Only `SourcingError::InvalidRequest` is meaningful to a caller; the tier errors
//! drive the fallback chain and end up in logs and `errorDetails`.

use std::time::Duration;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures of the external generator call.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generator request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("generator HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("generator returned an empty response")]
  EmptyResponse,
  #[error("generator returned unparseable output: {0}")]
  Unparseable(String),
}

/// Generator output parsed but no usable question survived validation.
#[derive(Debug, Error)]
#[error("generator output failed validation: {reason}")]
pub struct ValidationFailed {
  pub reason: String,
}

/// Persisted pool failures. All of them move the chain to the corpus.
#[derive(Debug, Error)]
pub enum PoolError {
  #[error("pool for '{format}' has {available} questions, {required} required")]
  Insufficient { format: String, available: usize, required: usize },
  #[error("pool store error: {0}")]
  Transport(#[from] sqlx::Error),
  #[error("pool query timed out after {0:?}")]
  Timeout(Duration),
}

/// Attempt history and rewards store failures.
#[derive(Debug, Error)]
pub enum HistoryError {
  #[error("attempt store error: {0}")]
  Store(#[from] sqlx::Error),
  #[error("stored attempt is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),
  #[error("no quiz was served under request id {0}")]
  UnknownQuiz(String),
  #[error("quiz {0} has already been answered")]
  AlreadyAnswered(String),
}

#[derive(Debug, Error)]
pub enum AdminError {
  #[error("admin account already exists: {0}")]
  Conflict(String),
  #[error("invalid admin account: {0}")]
  Invalid(String),
  #[error("admin store error: {0}")]
  Store(#[from] sqlx::Error),
}

/// Errors the sourcing coordinator returns to its caller.
#[derive(Debug, Error)]
pub enum SourcingError {
  #[error("invalid quiz request: {0}")]
  InvalidRequest(String),
  #[error("quiz request cancelled")]
  Cancelled,
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
  #[error("migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors surfaced by the non-quiz HTTP endpoints.
#[derive(Debug, Error)]
pub enum AppError {
  #[error("Bad request: {0}")]
  BadRequest(String),
  #[error("Not found: {0}")]
  NotFound(String),
  #[error("Conflict: {0}")]
  Conflict(String),
  #[error("Internal server error: {0}")]
  InternalServerError(String),
}

impl From<HistoryError> for AppError {
  fn from(err: HistoryError) -> Self {
    match err {
      HistoryError::UnknownQuiz(_) => AppError::NotFound(err.to_string()),
      HistoryError::AlreadyAnswered(_) => AppError::Conflict(err.to_string()),
      _ => AppError::InternalServerError(err.to_string()),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, error_message) = match self {
      AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
      AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
      AppError::InternalServerError(msg) => {
        tracing::error!("Internal Server Error: {}", msg);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
      }
    };

    let body = Json(json!({
      "error": error_message,
      "status": status.as_u16()
    }));

    (status, body).into_response()
  }
}
