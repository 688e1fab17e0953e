//! Attempt history and rewards.
//!
//! Every served quiz is stored with its answer key under the response's `requestId`.
//! An attempt is scored against that record and can be submitted once.
//! Recent attempts feed the generator's de-duplication hint; perfect attempts earn reward points.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{sqlite::SqlitePool, types::Json};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{normalize_format, QuizQuestion};
use crate::error::HistoryError;

#[async_trait]
pub trait AttemptHistory: Send + Sync {
  /// Distinct question texts from the user's last `attempts` attempts, newest first.
  async fn recent_question_texts(&self, user_id: &str, attempts: usize) -> Result<Vec<String>, HistoryError>;
}

/// A quiz as it was handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedQuiz {
  pub request_id: String,
  pub user_id: String,
  pub format: String,
  pub questions: Vec<QuizQuestion>,
  pub answered: bool,
}

#[derive(sqlx::FromRow)]
struct ServedRow {
  request_id: String,
  user_id: String,
  format: String,
  questions: Json<Vec<QuizQuestion>>,
  answered_at: Option<String>,
}

impl From<ServedRow> for ServedQuiz {
  fn from(row: ServedRow) -> Self {
    ServedQuiz {
      request_id: row.request_id,
      user_id: row.user_id,
      format: row.format,
      questions: row.questions.0,
      answered: row.answered_at.is_some(),
    }
  }
}

/// A finished attempt, scored against the served quiz.
#[derive(Debug, Clone)]
pub struct NewAttempt {
  pub request_id: String,
  pub user_id: String,
  pub format: String,
  pub question_texts: Vec<String>,
  pub score: i64,
  pub total: i64,
}

impl NewAttempt {
  pub fn is_perfect(&self) -> bool {
    self.total > 0 && self.score == self.total
  }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReceipt {
  pub attempt_id: String,
  pub score: i64,
  pub total: i64,
  pub perfect: bool,
  pub points_awarded: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRewards {
  pub user_id: String,
  pub points: i64,
  pub perfect_quizzes: i64,
}

pub struct SqlAttemptStore {
  db: SqlitePool,
  points_per_perfect: i64,
}

impl SqlAttemptStore {
  pub fn new(db: SqlitePool, points_per_perfect: i64) -> Self {
    Self { db, points_per_perfect }
  }

  /// Keep the served questions so a later attempt can be scored against them.
  #[instrument(level = "debug", skip(self, questions), fields(n = questions.len()))]
  pub async fn remember_quiz(
    &self,
    request_id: &str,
    user_id: &str,
    format: &str,
    questions: &[QuizQuestion],
  ) -> Result<(), HistoryError> {
    sqlx::query("INSERT INTO served_quizzes (request_id, user_id, format, questions) VALUES (?, ?, ?, ?)")
      .bind(request_id)
      .bind(user_id)
      .bind(normalize_format(format))
      .bind(Json(questions))
      .execute(&self.db)
      .await?;
    Ok(())
  }

  pub async fn served_quiz(&self, request_id: &str) -> Result<Option<ServedQuiz>, HistoryError> {
    let row = sqlx::query_as::<_, ServedRow>(
      "SELECT request_id, user_id, format, questions, answered_at FROM served_quizzes WHERE request_id = ?",
    )
    .bind(request_id)
    .fetch_optional(&self.db)
    .await?;
    Ok(row.map(ServedQuiz::from))
  }

  /// Store the attempt and, when perfect, credit the user's rewards in the same transaction.
  /// The served quiz is marked answered in that transaction, so a second submission fails.
  #[instrument(level = "info", skip(self, attempt), fields(request_id = %attempt.request_id, user_id = %attempt.user_id, score = attempt.score, total = attempt.total))]
  pub async fn record_attempt(&self, attempt: &NewAttempt) -> Result<AttemptReceipt, HistoryError> {
    let attempt_id = Uuid::new_v4().to_string();
    let perfect = attempt.is_perfect();
    let points_awarded = if perfect { self.points_per_perfect } else { 0 };

    let mut tx = self.db.begin().await?;
    let claimed = sqlx::query(
      "UPDATE served_quizzes SET answered_at = CURRENT_TIMESTAMP \
       WHERE request_id = ? AND user_id = ? AND answered_at IS NULL",
    )
    .bind(&attempt.request_id)
    .bind(&attempt.user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if claimed == 0 {
      let known: Option<String> = sqlx::query_scalar("SELECT request_id FROM served_quizzes WHERE request_id = ? AND user_id = ?")
        .bind(&attempt.request_id)
        .bind(&attempt.user_id)
        .fetch_optional(&mut *tx)
        .await?;
      return Err(match known {
        Some(_) => HistoryError::AlreadyAnswered(attempt.request_id.clone()),
        None => HistoryError::UnknownQuiz(attempt.request_id.clone()),
      });
    }

    sqlx::query(
      "INSERT INTO quiz_attempts (attempt_id, user_id, format, question_texts, score, total) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&attempt_id)
    .bind(&attempt.user_id)
    .bind(normalize_format(&attempt.format))
    .bind(Json(&attempt.question_texts))
    .bind(attempt.score)
    .bind(attempt.total)
    .execute(&mut *tx)
    .await?;

    if perfect {
      sqlx::query(
        r#"
        INSERT INTO user_rewards (user_id, points, perfect_quizzes)
        VALUES (?, ?, 1)
        ON CONFLICT(user_id) DO UPDATE SET
          points = user_rewards.points + excluded.points,
          perfect_quizzes = user_rewards.perfect_quizzes + 1,
          updated_at = CURRENT_TIMESTAMP
        "#,
      )
      .bind(&attempt.user_id)
      .bind(points_awarded)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;

    if perfect {
      info!(target: "quiz", user_id = %attempt.user_id, points = points_awarded, "Perfect score rewarded");
    }
    Ok(AttemptReceipt { attempt_id, score: attempt.score, total: attempt.total, perfect, points_awarded })
  }

  pub async fn rewards_for(&self, user_id: &str) -> Result<UserRewards, HistoryError> {
    let row = sqlx::query_as::<_, UserRewards>(
      "SELECT user_id, points, perfect_quizzes FROM user_rewards WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&self.db)
    .await?;

    Ok(row.unwrap_or_else(|| UserRewards { user_id: user_id.to_string(), points: 0, perfect_quizzes: 0 }))
  }
}

#[async_trait]
impl AttemptHistory for SqlAttemptStore {
  async fn recent_question_texts(&self, user_id: &str, attempts: usize) -> Result<Vec<String>, HistoryError> {
    let rows: Vec<String> = sqlx::query_scalar(
      "SELECT question_texts FROM quiz_attempts WHERE user_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(attempts as i64)
    .fetch_all(&self.db)
    .await?;

    let mut seen = HashSet::new();
    let mut texts = Vec::new();
    for raw in rows {
      for text in serde_json::from_str::<Vec<String>>(&raw)? {
        if seen.insert(text.clone()) {
          texts.push(text);
        }
      }
    }
    Ok(texts)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::connect_in_memory;

  fn question(text: &str) -> QuizQuestion {
    QuizQuestion {
      id: format!("id-{text}"),
      question: text.into(),
      options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
      correct_answer: "A".into(),
      explanation: String::new(),
    }
  }

  /// Serve a quiz with `texts` to `user` and return its request id.
  async fn serve(store: &SqlAttemptStore, user: &str, texts: &[&str]) -> String {
    let request_id = Uuid::new_v4().to_string();
    let questions: Vec<QuizQuestion> = texts.iter().map(|t| question(t)).collect();
    store.remember_quiz(&request_id, user, "IPL", &questions).await.unwrap();
    request_id
  }

  fn attempt(request_id: &str, user: &str, texts: &[&str], score: i64) -> NewAttempt {
    NewAttempt {
      request_id: request_id.into(),
      user_id: user.into(),
      format: "IPL".into(),
      question_texts: texts.iter().map(|t| t.to_string()).collect(),
      score,
      total: texts.len() as i64,
    }
  }

  async fn play(store: &SqlAttemptStore, user: &str, texts: &[&str], score: i64) -> AttemptReceipt {
    let request_id = serve(store, user, texts).await;
    store.record_attempt(&attempt(&request_id, user, texts, score)).await.unwrap()
  }

  #[tokio::test]
  async fn recent_texts_cover_only_the_last_attempts() {
    let store = SqlAttemptStore::new(connect_in_memory().await.unwrap(), 100);
    for i in 0..7 {
      let a = format!("q{i}a");
      let b = format!("q{i}b");
      play(&store, "u1", &[&a, &b, "shared"], 0).await;
    }
    play(&store, "u2", &["other"], 0).await;

    let texts = store.recent_question_texts("u1", 5).await.unwrap();
    assert_eq!(texts.len(), 11); // 5 attempts x 2 distinct + "shared" once
    assert_eq!(texts[0], "q6a");
    assert!(texts.contains(&"q2b".to_string()));
    assert!(!texts.contains(&"q1a".to_string()));
    assert!(!texts.contains(&"other".to_string()));
  }

  #[tokio::test]
  async fn perfect_attempts_accumulate_rewards() {
    let store = SqlAttemptStore::new(connect_in_memory().await.unwrap(), 50);

    let miss = play(&store, "u1", &["a", "b"], 1).await;
    assert!(!miss.perfect);
    assert_eq!(miss.points_awarded, 0);
    assert_eq!(store.rewards_for("u1").await.unwrap().points, 0);

    let hit = play(&store, "u1", &["a", "b"], 2).await;
    assert!(hit.perfect);
    play(&store, "u1", &["c"], 1).await;

    let rewards = store.rewards_for("u1").await.unwrap();
    assert_eq!(rewards, UserRewards { user_id: "u1".into(), points: 100, perfect_quizzes: 2 });
  }

  #[tokio::test]
  async fn served_quiz_keeps_the_answer_key() {
    let store = SqlAttemptStore::new(connect_in_memory().await.unwrap(), 100);
    let request_id = serve(&store, "u1", &["a", "b"]).await;

    let served = store.served_quiz(&request_id).await.unwrap().unwrap();
    assert_eq!(served.user_id, "u1");
    assert_eq!(served.format, "ipl");
    assert_eq!(served.questions, vec![question("a"), question("b")]);
    assert!(!served.answered);
    assert!(store.served_quiz("missing").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn a_quiz_can_be_answered_once() {
    let store = SqlAttemptStore::new(connect_in_memory().await.unwrap(), 100);
    let request_id = serve(&store, "u1", &["a"]).await;

    store.record_attempt(&attempt(&request_id, "u1", &["a"], 1)).await.unwrap();
    assert!(store.served_quiz(&request_id).await.unwrap().unwrap().answered);

    let again = store.record_attempt(&attempt(&request_id, "u1", &["a"], 1)).await;
    assert!(matches!(again, Err(HistoryError::AlreadyAnswered(_))));
    assert_eq!(store.rewards_for("u1").await.unwrap().points, 100);
  }

  #[tokio::test]
  async fn attempts_need_a_quiz_served_to_that_user() {
    let store = SqlAttemptStore::new(connect_in_memory().await.unwrap(), 100);
    let request_id = serve(&store, "u1", &["a"]).await;

    let stranger = store.record_attempt(&attempt(&request_id, "u2", &["a"], 1)).await;
    assert!(matches!(stranger, Err(HistoryError::UnknownQuiz(_))));
    let unknown = store.record_attempt(&attempt("nope", "u1", &["a"], 1)).await;
    assert!(matches!(unknown, Err(HistoryError::UnknownQuiz(_))));
    assert_eq!(store.rewards_for("u2").await.unwrap().points, 0);
    assert!(store.recent_question_texts("u2", 5).await.unwrap().is_empty());
  }

  #[test]
  fn empty_attempt_is_never_perfect() {
    assert!(!attempt("r", "u", &[], 0).is_perfect());
  }
}
