//! Application state: the sourcing coordinator, attempt/rewards store and admin store.
//!
//! This module owns startup wiring:
//!   - connecting the database and running migrations
//!   - seeding the question pool and admin accounts from the TOML config
//!   - building the optional generator client
//!
//! If no generator is configured, every quiz comes from the pool or the corpus.

use std::{collections::BTreeMap, sync::Arc};

use sqlx::sqlite::SqlitePool;
use tracing::{error, info, instrument};

use crate::admins::{AdminStore, NewAdmin};
use crate::config::{database_url_from_env, load_quiz_config_from_env, QuizConfig};
use crate::db;
use crate::domain::{normalize_format, QuizQuestion};
use crate::error::StartupError;
use crate::genai::{GenAi, QuizGenerator};
use crate::history::SqlAttemptStore;
use crate::pool::{QuestionPool, SqlQuestionPool};
use crate::sourcing::QuizSourcer;

#[derive(Clone)]
pub struct AppState {
    pub sourcer: Arc<QuizSourcer>,
    pub attempts: Arc<SqlAttemptStore>,
    pub admins: AdminStore,
}

impl AppState {
    /// Build state from env: load config, connect the database, init the generator.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, StartupError> {
        let cfg = load_quiz_config_from_env().unwrap_or_default();
        let db = db::connect(&database_url_from_env()).await?;

        let generator = GenAi::from_env(cfg.prompts.clone());
        if let Some(g) = &generator {
            info!(target: "indcric_backend", base_url = %g.base_url, model = %g.model, "Quiz generator enabled.");
        } else {
            info!(target: "indcric_backend", "Quiz generator disabled (no GENAI_API_KEY). Using pool/corpus only.");
        }
        let generator = generator.map(|g| Arc::new(g) as Arc<dyn QuizGenerator>);

        Ok(Self::build(db, cfg, generator).await)
    }

    /// Wire the stores and the coordinator around an open database, then seed it.
    pub async fn build(db: SqlitePool, cfg: QuizConfig, generator: Option<Arc<dyn QuizGenerator>>) -> Self {
        let pool = Arc::new(SqlQuestionPool::new(db.clone(), cfg.sourcing.pool_index_ttl()));
        let attempts = Arc::new(SqlAttemptStore::new(db.clone(), cfg.rewards.points_per_perfect));
        let admins = AdminStore::new(db);

        seed_question_pool(&pool, &cfg).await;
        seed_admins(&admins, &cfg).await;

        match pool.inventory().await {
            Ok(rows) => {
                for (format, n) in rows {
                    info!(target: "quiz", %format, questions = n, "Startup pool inventory");
                }
            }
            Err(e) => error!(target: "quiz", error = %e, "Could not read pool inventory"),
        }

        let sourcer = QuizSourcer::new(generator, pool, attempts.clone(), cfg.sourcing.clone());
        Self { sourcer: Arc::new(sourcer), attempts, admins }
    }
}

async fn seed_question_pool(pool: &SqlQuestionPool, cfg: &QuizConfig) {
    let mut by_format: BTreeMap<String, Vec<QuizQuestion>> = BTreeMap::new();
    for (i, q) in cfg.questions.iter().enumerate() {
        by_format.entry(normalize_format(&q.format)).or_default().push(QuizQuestion {
            id: format!("cfg-{i}"),
            question: q.question.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
            explanation: q.explanation.clone(),
        });
    }

    for (format, questions) in by_format {
        match pool.store_questions(&format, &questions).await {
            Ok(added) => info!(target: "quiz", %format, added, offered = questions.len(), "Seeded question bank"),
            Err(e) => error!(target: "quiz", %format, error = %e, "Failed to seed question bank"),
        }
    }
}

async fn seed_admins(admins: &AdminStore, cfg: &QuizConfig) {
    let wanted: Vec<NewAdmin> = cfg
        .admins
        .iter()
        .map(|a| NewAdmin { username: a.username.clone(), email: a.email.clone(), role: a.role })
        .collect();
    if let Err(e) = admins.seed(&wanted).await {
        error!(target: "indcric_backend", error = %e, "Failed to seed admin accounts");
    }
    match admins.list().await {
        Ok(list) => info!(target: "indcric_backend", admins = list.len(), "Startup admin inventory"),
        Err(e) => error!(target: "indcric_backend", error = %e, "Could not list admin accounts"),
    }
}
