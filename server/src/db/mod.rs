// mapofus-server/src/db/mod.rs

//! Postgres implementations of the relational collaborators.

pub mod admin_grants;
pub mod coupons;
pub mod orders;
pub mod settings;

pub use admin_grants::PgAdminGrants;
pub use coupons::PgCoupons;
pub use orders::PgOrderStore;
pub use settings::PgSettings;

use crate::config::AppConfig;
use mapofus::MapError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .connect(&config.database_url)
    .await?;
  info!(max_connections = config.database_max_connections, "Connected to the database.");
  if config.run_migrations {
    MIGRATOR.run(&pool).await?;
    info!("Database migrations applied.");
  }
  Ok(pool)
}

/// Converts a driver error into the domain's persistence failure, logging the
/// detail that the caller will never see.
pub(crate) fn persistence(context: &str, err: sqlx::Error) -> MapError {
  error!(error = %err, "{} failed.", context);
  MapError::Persistence(format!("{context}: {err}"))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
  err
    .as_database_error()
    .is_some_and(|db| db.is_unique_violation() && db.constraint() == Some(constraint))
}
