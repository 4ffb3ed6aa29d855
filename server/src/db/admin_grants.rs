// mapofus-server/src/db/admin_grants.rs

use super::persistence;
use async_trait::async_trait;
use mapofus::model::ADMIN_ROLE;
use mapofus::store::AdminGrantStore;
use mapofus::MapResult;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

/// Outcome of [`PgAdminGrants::grant_by_email`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
  Granted { user_id: Uuid },
  AlreadyAdmin { user_id: Uuid },
  UnknownUser,
}

#[derive(Clone)]
pub struct PgAdminGrants {
  pool: PgPool,
}

impl PgAdminGrants {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Resolves `email` in the auth user table and upserts an admin grant.
  /// This is the only path that creates grants.
  #[instrument(name = "PgAdminGrants::grant_by_email", skip(self), err(Display))]
  pub async fn grant_by_email(&self, email: &str) -> MapResult<GrantOutcome> {
    let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM auth.users WHERE lower(email) = lower($1)")
      .bind(email.trim())
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| persistence("look up auth user", e))?;
    let Some(user_id) = user_id else {
      return Ok(GrantOutcome::UnknownUser);
    };

    if self.role_for(user_id).await?.is_some() {
      return Ok(GrantOutcome::AlreadyAdmin { user_id });
    }

    sqlx::query(
      "INSERT INTO admin_users (user_id, role, granted_at) VALUES ($1, $2, now()) \
       ON CONFLICT (user_id) DO UPDATE SET role = excluded.role, granted_at = excluded.granted_at",
    )
    .bind(user_id)
    .bind(ADMIN_ROLE)
    .execute(&self.pool)
    .await
    .map_err(|e| persistence("grant admin", e))?;
    Ok(GrantOutcome::Granted { user_id })
  }
}

#[async_trait]
impl AdminGrantStore for PgAdminGrants {
  async fn role_for(&self, user_id: Uuid) -> MapResult<Option<String>> {
    sqlx::query_scalar("SELECT role FROM admin_users WHERE user_id = $1")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| persistence("read admin grant", e))
  }
}
