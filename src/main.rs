//! IndCric · Cricket Quiz Backend
//!
//! - Axum HTTP API serving quizzes sourced from generator → pool → corpus
//! - Optional generative-AI integration (via environment variables)
//! - SQLite persistence for the question pool, attempts, rewards and admins
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   DATABASE_URL     : default "sqlite://indcric.db?mode=rwc"
//!   GENAI_API_KEY    : enables quiz generation if present
//!   GENAI_BASE_URL   : default Google's OpenAI-compatible Gemini endpoint
//!   GENAI_MODEL      : default "gemini-2.0-flash"
//!   QUIZ_CONFIG_PATH : path to TOML config (prompts, tuning, question bank, admins)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use indcric_backend::config::port_from_env;
use indcric_backend::state::AppState;
use indcric_backend::{build_router, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (database, stores, generator client).
  let state = Arc::new(AppState::from_env().await?);

  // HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], port_from_env()));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "indcric_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
