//! Loading quiz configuration (prompts, sourcing tuning, question bank, admins) from TOML,
//! plus the handful of plain environment settings.
//!
//! See `QuizConfig` for the expected schema. Every section is optional.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::admins::AdminRole;
use crate::corpus::MAX_QUESTION_COUNT;
use crate::domain::DEFAULT_QUESTION_COUNT;

const DEFAULT_DATABASE_URL: &str = "sqlite://indcric.db?mode=rwc";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub sourcing: SourcingConfig,
  #[serde(default)]
  pub rewards: RewardsConfig,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
  #[serde(default)]
  pub admins: Vec<AdminCfg>,
}

/// Prompts used by the generator client.
/// Placeholders: `{format}`, `{count}`, `{recent_questions}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You are a cricket trivia writer. Respond ONLY with strict JSON, no markdown.".into(),
      quiz_user_template: "Write {count} multiple-choice cricket trivia questions for the '{format}' format.\n\
        Return JSON: {\"questions\": [{\"id\": string, \"question\": string, \"options\": [4 strings], \"correctAnswer\": string, \"explanation\": string}]}.\n\
        correctAnswer MUST be exactly one of the options. Facts must be accurate.\n\
        Do NOT repeat any of these recently seen questions:\n{recent_questions}".into(),
    }
  }
}

/// Tuning for the sourcing chain. Timeouts are per tier.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SourcingConfig {
  pub question_count: usize,
  pub recent_attempts: usize,
  pub generator_timeout_secs: u64,
  pub pool_timeout_secs: u64,
  pub history_timeout_secs: u64,
  pub pool_index_ttl_secs: u64,
  /// Accept a generator quiz with fewer than `question_count` valid questions.
  pub accept_short_ai_quiz: bool,
  /// Store validated generator questions in the pool.
  pub cache_generated: bool,
}

impl Default for SourcingConfig {
  fn default() -> Self {
    Self {
      question_count: DEFAULT_QUESTION_COUNT,
      recent_attempts: 5,
      generator_timeout_secs: 8,
      pool_timeout_secs: 3,
      history_timeout_secs: 3,
      pool_index_ttl_secs: 300,
      accept_short_ai_quiz: true,
      cache_generated: true,
    }
  }
}

impl SourcingConfig {
  pub fn generator_timeout(&self) -> Duration { Duration::from_secs(self.generator_timeout_secs) }
  pub fn pool_timeout(&self) -> Duration { Duration::from_secs(self.pool_timeout_secs) }
  pub fn history_timeout(&self) -> Duration { Duration::from_secs(self.history_timeout_secs) }
  pub fn pool_index_ttl(&self) -> Duration { Duration::from_secs(self.pool_index_ttl_secs) }

  /// Clamp `question_count` to `1..=MAX_QUESTION_COUNT` so the corpus can always fill a quiz.
  pub fn sanitized(mut self) -> Self {
    let wanted = self.question_count;
    self.question_count = wanted.clamp(1, MAX_QUESTION_COUNT);
    if self.question_count != wanted {
      warn!(target: "indcric_backend", wanted, using = self.question_count, max = MAX_QUESTION_COUNT, "question_count out of range; clamped");
    }
    self
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
  pub points_per_perfect: i64,
}

impl Default for RewardsConfig {
  fn default() -> Self {
    Self { points_per_perfect: 100 }
  }
}

/// Question bank entry seeded into the persisted pool at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub format: String,
  pub question: String,
  pub options: Vec<String>,
  #[serde(alias = "correctAnswer")]
  pub correct_answer: String,
  #[serde(default)]
  pub explanation: String,
}

/// Admin account seeded at startup when missing.
#[derive(Clone, Debug, Deserialize)]
pub struct AdminCfg {
  pub username: String,
  pub email: String,
  #[serde(default)]
  pub role: AdminRole,
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_quiz_config(&s) {
      Ok(cfg) => {
        info!(target: "indcric_backend", %path, questions = cfg.questions.len(), admins = cfg.admins.len(), "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "indcric_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "indcric_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_quiz_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  let mut cfg = toml::from_str::<QuizConfig>(s)?;
  cfg.sourcing = cfg.sourcing.sanitized();
  Ok(cfg)
}

pub fn database_url_from_env() -> String {
  std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into())
}

pub fn port_from_env() -> u16 {
  std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()).unwrap_or(3000)
}
