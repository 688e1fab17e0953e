//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::logic::{score_attempt, serve_quiz};
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generator: state.sourcer.generator_enabled() })
}

/// Takes the raw body so malformed JSON still gets a quiz instead of a 4xx.
#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_post_quiz(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
  let request_id = Uuid::new_v4().to_string();
  let out = serve_quiz(&state, &body, request_id).await;
  info!(target: "quiz", request_id = %out.request_id, source = ?out.source, code = ?out.error_details.as_ref().map(|d| d.code.as_str()), "HTTP quiz served");
  Json(out)
}

/// Scores against the quiz stored under `requestId`; only its owner may answer, and only once.
#[instrument(level = "info", skip(state, body), fields(request_id = %body.request_id, user_id = %body.user_id, answers = body.answers.len()))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AttemptIn>,
) -> Result<impl IntoResponse, AppError> {
  if let Err(validation_errors) = body.validate() {
    return Err(AppError::BadRequest(validation_errors.to_string()));
  }

  let served = state
    .attempts
    .served_quiz(body.request_id.trim())
    .await?
    .filter(|quiz| quiz.user_id == body.user_id.trim())
    .ok_or_else(|| AppError::NotFound(format!("no quiz {} was served to this user", body.request_id)))?;
  if served.answered {
    return Err(AppError::Conflict(format!("quiz {} has already been answered", served.request_id)));
  }

  let attempt = score_attempt(&served, &body);
  let receipt = state.attempts.record_attempt(&attempt).await?;
  info!(target: "quiz", attempt_id = %receipt.attempt_id, score = receipt.score, total = receipt.total, perfect = receipt.perfect, "HTTP attempt recorded");
  Ok((StatusCode::CREATED, Json(receipt)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_rewards(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let rewards = state.attempts.rewards_for(&user_id).await?;
  Ok(Json(rewards))
}
