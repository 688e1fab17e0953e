//! Persisted question pool: the second tier of the sourcing chain.
//!
//! Questions live in `pool_questions`. For each format the id-ordered list of
//! question ids is cached in memory and refreshed after a TTL, so a fetch only
//! reads the rows of the chosen window.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};

use async_trait::async_trait;
use rand::Rng;
use sqlx::{sqlite::SqlitePool, types::Json, QueryBuilder, Sqlite};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::{normalize_format, QuizQuestion};
use crate::error::PoolError;
use crate::validate::check_question;

#[async_trait]
pub trait QuestionPool: Send + Sync {
  /// Exactly `count` questions for `format`, or `PoolError::Insufficient`.
  async fn fetch_pool(&self, format: &str, count: usize) -> Result<Vec<QuizQuestion>, PoolError>;

  /// Add validated questions to the pool. Returns how many were new.
  async fn store_questions(&self, format: &str, questions: &[QuizQuestion]) -> Result<usize, PoolError>;
}

struct CachedIndex {
  ids: Arc<Vec<String>>,
  fetched_at: Instant,
}

#[derive(sqlx::FromRow)]
struct PoolRow {
  id: String,
  question: String,
  options: Json<Vec<String>>,
  correct_answer: String,
  explanation: String,
}

impl From<PoolRow> for QuizQuestion {
  fn from(row: PoolRow) -> Self {
    QuizQuestion {
      id: row.id,
      question: row.question,
      options: row.options.0,
      correct_answer: row.correct_answer,
      explanation: row.explanation,
    }
  }
}

pub struct SqlQuestionPool {
  db: SqlitePool,
  index: RwLock<HashMap<String, CachedIndex>>,
  ttl: Duration,
}

impl SqlQuestionPool {
  pub fn new(db: SqlitePool, ttl: Duration) -> Self {
    Self { db, index: RwLock::new(HashMap::new()), ttl }
  }

  /// Stable id-ordered list for a (normalized) format, from cache when fresh.
  async fn ordered_ids(&self, format: &str) -> Result<Arc<Vec<String>>, PoolError> {
    if let Some(entry) = self.index.read().await.get(format) {
      if entry.fetched_at.elapsed() < self.ttl {
        return Ok(entry.ids.clone());
      }
    }

    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM pool_questions WHERE format = ? ORDER BY id")
      .bind(format)
      .fetch_all(&self.db)
      .await?;
    debug!(target: "quiz", %format, ids = ids.len(), "Refreshed pool index");

    let ids = Arc::new(ids);
    self.index.write().await.insert(
      format.to_string(),
      CachedIndex { ids: ids.clone(), fetched_at: Instant::now() },
    );
    Ok(ids)
  }

  async fn invalidate(&self, format: &str) {
    self.index.write().await.remove(format);
  }

  async fn load_rows(&self, ids: &[String]) -> Result<Vec<PoolRow>, PoolError> {
    let mut query_builder = QueryBuilder::<Sqlite>::new(
      "SELECT id, question, options, correct_answer, explanation FROM pool_questions WHERE id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in ids {
      separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");

    Ok(query_builder.build_query_as::<PoolRow>().fetch_all(&self.db).await?)
  }

  /// Number of stored questions per format, for the startup inventory log.
  pub async fn inventory(&self) -> Result<Vec<(String, i64)>, PoolError> {
    let rows: Vec<(String, i64)> =
      sqlx::query_as("SELECT format, COUNT(*) FROM pool_questions GROUP BY format ORDER BY format")
        .fetch_all(&self.db)
        .await?;
    Ok(rows)
  }
}

#[async_trait]
impl QuestionPool for SqlQuestionPool {
  #[instrument(level = "debug", skip(self))]
  async fn fetch_pool(&self, format: &str, count: usize) -> Result<Vec<QuizQuestion>, PoolError> {
    let format = normalize_format(format);
    if count == 0 {
      return Ok(Vec::new());
    }

    let ids = self.ordered_ids(&format).await?;
    if ids.len() < count {
      return Err(PoolError::Insufficient { format, available: ids.len(), required: count });
    }

    let start = pick_window_start(&mut rand::thread_rng(), ids.len(), count);
    let window = &ids[start..start + count];

    let mut by_id: HashMap<String, QuizQuestion> = self
      .load_rows(window)
      .await?
      .into_iter()
      .map(QuizQuestion::from)
      .filter(|q| match check_question(q) {
        Ok(()) => true,
        Err(reason) => {
          warn!(target: "quiz", id = %q.id, %reason, "Skipping malformed pool question");
          false
        }
      })
      .map(|q| (q.id.clone(), q))
      .collect();
    let questions: Vec<QuizQuestion> = window.iter().filter_map(|id| by_id.remove(id)).collect();

    if questions.len() < count {
      // Rows vanished or went bad since the index was cached.
      self.invalidate(&format).await;
      return Err(PoolError::Insufficient { format, available: questions.len(), required: count });
    }
    Ok(questions)
  }

  #[instrument(level = "debug", skip(self, questions), fields(n = questions.len()))]
  async fn store_questions(&self, format: &str, questions: &[QuizQuestion]) -> Result<usize, PoolError> {
    let format = normalize_format(format);
    let mut tx = self.db.begin().await?;
    let mut added = 0usize;

    for q in questions {
      if let Err(reason) = check_question(q) {
        warn!(target: "quiz", %format, %reason, "Refusing to store malformed question");
        continue;
      }
      let result = sqlx::query(
        "INSERT OR IGNORE INTO pool_questions (id, format, question, options, correct_answer, explanation) \
         VALUES (?, ?, ?, ?, ?, ?)",
      )
      .bind(Uuid::new_v4().to_string())
      .bind(&format)
      .bind(&q.question)
      .bind(Json(&q.options))
      .bind(&q.correct_answer)
      .bind(&q.explanation)
      .execute(&mut *tx)
      .await?;
      added += result.rows_affected() as usize;
    }
    tx.commit().await?;

    if added > 0 {
      self.invalidate(&format).await;
    }
    Ok(added)
  }
}

/// Random window start in `[0, len)`; a window that would run past the end starts at 0.
pub fn pick_window_start<R: Rng + ?Sized>(rng: &mut R, len: usize, count: usize) -> usize {
  if len == 0 {
    return 0;
  }
  let start = rng.gen_range(0..len);
  if start + count > len { 0 } else { start }
}
