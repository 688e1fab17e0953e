//! SQLite connection pool and embedded migrations.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::StartupError;

/// Connect to `database_url` and apply migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool, StartupError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .acquire_timeout(Duration::from_secs(3))
    .connect(database_url)
    .await?;
  tracing::info!(target: "indcric_backend", "Database connected...");

  sqlx::migrate!("./migrations").run(&pool).await?;
  tracing::info!(target: "indcric_backend", "Migrations applied successfully.");
  Ok(pool)
}

/// Single-connection in-memory database with migrations applied.
/// The connection is never recycled, otherwise the database would vanish with it.
pub async fn connect_in_memory() -> Result<SqlitePool, StartupError> {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect("sqlite::memory:")
    .await?;
  sqlx::migrate!("./migrations").run(&pool).await?;
  Ok(pool)
}
