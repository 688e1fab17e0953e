//! Admin accounts, persisted with unique usernames and emails.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tracing::{info, instrument};
use validator::Validate;

use crate::error::AdminError;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AdminRole {
  SuperAdmin,
  #[default]
  Admin,
  Moderator,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct AdminAccount {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub role: AdminRole,
}

#[derive(Clone, Debug, Validate)]
pub struct NewAdmin {
  #[validate(length(min = 3, max = 20, message = "Username length must be between 3 and 20 characters."))]
  pub username: String,
  #[validate(email(message = "Email must be a valid address."))]
  pub email: String,
  pub role: AdminRole,
}

impl NewAdmin {
  /// Trimmed username, trimmed and lowercased email.
  fn normalized(&self) -> Self {
    Self {
      username: self.username.trim().to_string(),
      email: self.email.trim().to_lowercase(),
      role: self.role,
    }
  }
}

#[derive(Clone)]
pub struct AdminStore {
  db: SqlitePool,
}

impl AdminStore {
  pub fn new(db: SqlitePool) -> Self {
    Self { db }
  }

  #[instrument(level = "info", skip(self, admin), fields(username = %admin.username))]
  pub async fn create(&self, admin: &NewAdmin) -> Result<AdminAccount, AdminError> {
    let admin = admin.normalized();
    admin.validate().map_err(|e| AdminError::Invalid(e.to_string()))?;
    let NewAdmin { username, email, role } = admin;

    let id: i64 = sqlx::query_scalar("INSERT INTO admin_users (username, email, role) VALUES (?, ?, ?) RETURNING id")
      .bind(&username)
      .bind(&email)
      .bind(role)
      .fetch_one(&self.db)
      .await
      .map_err(|e| {
        if let sqlx::Error::Database(db) = &e {
          if db.is_unique_violation() {
            return AdminError::Conflict(format!("username '{username}' or email '{email}'"));
          }
        }
        AdminError::Store(e)
      })?;

    info!(target: "indcric_backend", id, %username, ?role, "Admin account created");
    Ok(AdminAccount { id, username, email, role })
  }

  pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminAccount>, AdminError> {
    let account = sqlx::query_as::<_, AdminAccount>(
      "SELECT id, username, email, role FROM admin_users WHERE email = ?",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(&self.db)
    .await?;
    Ok(account)
  }

  pub async fn list(&self) -> Result<Vec<AdminAccount>, AdminError> {
    let accounts = sqlx::query_as::<_, AdminAccount>("SELECT id, username, email, role FROM admin_users ORDER BY id")
      .fetch_all(&self.db)
      .await?;
    Ok(accounts)
  }

  /// Create each configured admin unless one with that email already exists.
  /// Returns how many were created.
  pub async fn seed(&self, admins: &[NewAdmin]) -> Result<usize, AdminError> {
    let mut created = 0;
    for admin in admins {
      if self.find_by_email(&admin.email).await?.is_some() {
        continue;
      }
      match self.create(admin).await {
        Ok(_) => created += 1,
        Err(AdminError::Conflict(what)) => {
          tracing::warn!(target: "indcric_backend", %what, "Skipping seeded admin: already taken");
        }
        Err(e) => return Err(e),
      }
    }
    Ok(created)
  }
}
