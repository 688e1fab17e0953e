//! Quiz sourcing coordinator.
//!
//! Runs the tiers strictly forward: generator, then persisted pool, then static corpus.
//! The first tier that produces a usable quiz ends the chain. Tier failures are logged
//! and folded into `errorDetails`; they never fail the request. The corpus cannot fail,
//! so every valid request gets a quiz.

use std::{future::Future, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::config::SourcingConfig;
use crate::corpus::fetch_corpus;
use crate::domain::{normalize_format, ErrorDetails, QuizQuestion, QuizRequest, SourcedQuiz};
use crate::error::{GenerationError, PoolError, SourcingError, ValidationFailed};
use crate::genai::{GenerationRequest, QuizGenerator};
use crate::history::AttemptHistory;
use crate::pool::QuestionPool;
use crate::validate::validate_quiz;

/// Why the generator tier did not produce the quiz.
#[derive(Debug, Error)]
pub enum GeneratorFailure {
  #[error("quiz generator is not configured")]
  Disabled,
  #[error("quiz generation timed out after {0:?}")]
  Timeout(Duration),
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error(transparent)]
  Validation(#[from] ValidationFailed),
  #[error("generator returned {got} usable questions, {wanted} required")]
  ShortQuiz { got: usize, wanted: usize },
}

impl GeneratorFailure {
  pub fn code(&self) -> &'static str {
    match self {
      GeneratorFailure::Disabled => "GENERATOR_DISABLED",
      GeneratorFailure::Timeout(_) => "GENERATION_TIMEOUT",
      GeneratorFailure::Generation(_) => "GENERATION_FAILED",
      GeneratorFailure::Validation(_) => "VALIDATION_FAILED",
      GeneratorFailure::ShortQuiz { .. } => "AI_SHORT_QUIZ",
    }
  }

  pub fn details(&self) -> ErrorDetails {
    ErrorDetails {
      message: "AI quiz unavailable; served a fallback quiz instead.".into(),
      original_error: Some(self.to_string()),
      code: self.code().into(),
    }
  }
}

/// Chain position. Each variant after the first carries the generator's failure.
enum Tier {
  Generator,
  Pool(GeneratorFailure),
  Corpus(GeneratorFailure),
}

/// Cooperative cancellation signal handed to the coordinator.
#[derive(Clone)]
pub struct Cancellation(watch::Receiver<bool>);

/// Trips the paired `Cancellation` when dropped.
pub struct CancelOnDrop(watch::Sender<bool>);

impl Drop for CancelOnDrop {
  fn drop(&mut self) {
    self.0.send_replace(true);
  }
}

impl Cancellation {
  pub fn new() -> (CancelOnDrop, Self) {
    let (tx, rx) = watch::channel(false);
    (CancelOnDrop(tx), Self(rx))
  }

  /// A signal that never fires.
  pub fn never() -> Self {
    let (_tx, rx) = watch::channel(false);
    Self(rx)
  }

  pub fn is_cancelled(&self) -> bool {
    *self.0.borrow()
  }

  /// Resolves once cancelled; pends forever if the sender went away without cancelling.
  pub async fn cancelled(&mut self) {
    loop {
      if *self.0.borrow_and_update() {
        return;
      }
      if self.0.changed().await.is_err() {
        std::future::pending::<()>().await;
      }
    }
  }
}

pub struct QuizSourcer {
  generator: Option<Arc<dyn QuizGenerator>>,
  pool: Arc<dyn QuestionPool>,
  history: Arc<dyn AttemptHistory>,
  settings: SourcingConfig,
}

impl QuizSourcer {
  pub fn new(
    generator: Option<Arc<dyn QuizGenerator>>,
    pool: Arc<dyn QuestionPool>,
    history: Arc<dyn AttemptHistory>,
    settings: SourcingConfig,
  ) -> Self {
    Self { generator, pool, history, settings: settings.sanitized() }
  }

  pub fn generator_enabled(&self) -> bool {
    self.generator.is_some()
  }

  pub fn question_count(&self) -> usize {
    self.settings.question_count
  }

  /// Source a quiz for `request`. Only malformed input or cancellation returns an error.
  #[instrument(level = "info", skip(self, request, cancel), fields(format = %request.format, user_id = %request.user_id))]
  pub async fn source_quiz(&self, request: &QuizRequest, cancel: &Cancellation) -> Result<SourcedQuiz, SourcingError> {
    request.validate().map_err(|e| SourcingError::InvalidRequest(e.to_string()))?;
    if request.user_id.trim().is_empty() {
      return Err(SourcingError::InvalidRequest("userId must not be blank".into()));
    }
    let format = normalize_format(&request.format);
    if format.is_empty() {
      return Err(SourcingError::InvalidRequest("format must not be blank".into()));
    }
    let user_id = request.user_id.trim();
    let count = self.settings.question_count;

    let mut tier = Tier::Generator;
    loop {
      if cancel.is_cancelled() {
        info!(target: "quiz", %format, %user_id, "Quiz request cancelled; stopping the chain");
        return Err(SourcingError::Cancelled);
      }

      tier = match tier {
        Tier::Generator => match self.try_generator(&format, user_id, count, cancel).await? {
          Ok(questions) => {
            info!(target: "quiz", %format, %user_id, n = questions.len(), source = "ai", "Quiz sourced");
            return Ok(SourcedQuiz::ai(questions));
          }
          Err(failure) => {
            warn!(target: "quiz", %format, %user_id, code = failure.code(), error = %failure, "Generator tier failed; trying pool");
            Tier::Pool(failure)
          }
        },
        Tier::Pool(reason) => {
          let fetched = with_timeout(self.settings.pool_timeout(), self.pool.fetch_pool(&format, count), cancel)
            .await?
            .unwrap_or_else(|| Err(PoolError::Timeout(self.settings.pool_timeout())));
          match fetched {
            Ok(questions) => {
              info!(target: "quiz", %format, %user_id, n = questions.len(), source = "pool", "Quiz sourced");
              return Ok(SourcedQuiz::fallback(questions, Some(reason.details())));
            }
            Err(e) => {
              warn!(target: "quiz", %format, %user_id, error = %e, "Pool tier failed; using static corpus");
              Tier::Corpus(reason)
            }
          }
        }
        Tier::Corpus(reason) => {
          let questions = fetch_corpus(&format, count);
          info!(target: "quiz", %format, %user_id, n = questions.len(), source = "corpus", "Quiz sourced");
          return Ok(SourcedQuiz::fallback(questions, Some(reason.details())));
        }
      };
    }
  }

  /// Generator tier. The outer `Result` only carries cancellation.
  async fn try_generator(
    &self,
    format: &str,
    user_id: &str,
    count: usize,
    cancel: &Cancellation,
  ) -> Result<Result<Vec<QuizQuestion>, GeneratorFailure>, SourcingError> {
    let Some(generator) = &self.generator else {
      return Ok(Err(GeneratorFailure::Disabled));
    };

    let recent_questions = self.recent_questions(user_id, cancel).await?;
    let request = GenerationRequest { format: format.to_string(), recent_questions, count };

    let timeout = self.settings.generator_timeout();
    let candidate = match with_timeout(timeout, generator.generate_quiz(&request), cancel).await? {
      None => return Ok(Err(GeneratorFailure::Timeout(timeout))),
      Some(Err(e)) => return Ok(Err(e.into())),
      Some(Ok(candidate)) => candidate,
    };

    let validated = match validate_quiz(&candidate, count) {
      Ok(v) => v,
      Err(e) => return Ok(Err(e.into())),
    };
    if validated.is_salvaged() {
      debug!(target: "quiz", %format, kept = validated.questions().len(), "Using salvaged generator output");
    }
    let questions = validated.into_questions();
    if questions.len() < count && !self.settings.accept_short_ai_quiz {
      return Ok(Err(GeneratorFailure::ShortQuiz { got: questions.len(), wanted: count }));
    }

    if self.settings.cache_generated {
      match with_timeout(self.settings.pool_timeout(), self.pool.store_questions(format, &questions), cancel).await? {
        Some(Ok(added)) => debug!(target: "quiz", %format, added, "Cached generated questions in pool"),
        Some(Err(e)) => warn!(target: "quiz", %format, error = %e, "Failed to cache generated questions"),
        None => warn!(target: "quiz", %format, "Timed out caching generated questions"),
      }
    }
    Ok(Ok(questions))
  }

  /// De-duplication hint. Any failure just means an empty hint.
  async fn recent_questions(&self, user_id: &str, cancel: &Cancellation) -> Result<Vec<String>, SourcingError> {
    let lookup = self.history.recent_question_texts(user_id, self.settings.recent_attempts);
    match with_timeout(self.settings.history_timeout(), lookup, cancel).await? {
      Some(Ok(texts)) => Ok(texts),
      Some(Err(e)) => {
        warn!(target: "quiz", %user_id, error = %e, "Could not read attempt history; generating without it");
        Ok(Vec::new())
      }
      None => {
        warn!(target: "quiz", %user_id, "Attempt history lookup timed out; generating without it");
        Ok(Vec::new())
      }
    }
  }
}

/// Await `fut` bounded by `limit`, racing the cancellation signal.
/// `Ok(None)` means the limit elapsed.
async fn with_timeout<F: Future>(limit: Duration, fut: F, cancel: &Cancellation) -> Result<Option<F::Output>, SourcingError> {
  let mut cancel = cancel.clone();
  tokio::select! {
    res = tokio::time::timeout(limit, fut) => Ok(res.ok()),
    _ = cancel.cancelled() => Err(SourcingError::Cancelled),
  }
}
