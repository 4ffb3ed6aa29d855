// mapofus-server/src/db/settings.rs

use super::persistence;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mapofus::model::AppSettings;
use mapofus::store::SettingsStore;
use mapofus::MapResult;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const SETTINGS_ID: &str = "main";

#[derive(Debug, FromRow)]
struct SettingsRow {
  image_provider: String,
  payment_link: Option<String>,
  updated_at: Option<DateTime<Utc>>,
  updated_by: Option<Uuid>,
}

impl From<SettingsRow> for AppSettings {
  fn from(row: SettingsRow) -> Self {
    AppSettings {
      image_provider: row.image_provider,
      payment_link: row.payment_link,
      updated_at: row.updated_at,
      updated_by: row.updated_by,
    }
  }
}

#[derive(Clone)]
pub struct PgSettings {
  pool: PgPool,
}

impl PgSettings {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SettingsStore for PgSettings {
  async fn get(&self) -> MapResult<Option<AppSettings>> {
    let row: Option<SettingsRow> =
      sqlx::query_as("SELECT image_provider, payment_link, updated_at, updated_by FROM app_settings WHERE id = $1")
        .bind(SETTINGS_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| persistence("read app settings", e))?;
    Ok(row.map(AppSettings::from))
  }

  async fn upsert(&self, settings: &AppSettings) -> MapResult<AppSettings> {
    let row: SettingsRow = sqlx::query_as(
      "INSERT INTO app_settings (id, image_provider, payment_link, updated_at, updated_by) \
       VALUES ($1, $2, $3, $4, $5) \
       ON CONFLICT (id) DO UPDATE SET image_provider = excluded.image_provider, \
         payment_link = excluded.payment_link, updated_at = excluded.updated_at, updated_by = excluded.updated_by \
       RETURNING image_provider, payment_link, updated_at, updated_by",
    )
    .bind(SETTINGS_ID)
    .bind(&settings.image_provider)
    .bind(&settings.payment_link)
    .bind(settings.updated_at)
    .bind(settings.updated_by)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| persistence("write app settings", e))?;
    Ok(row.into())
  }
}
