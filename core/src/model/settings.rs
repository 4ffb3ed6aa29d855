// mapofus/src/model/settings.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_IMAGE_PROVIDER: &str = "openai";

/// Role written by the grant-admin tool and recognised by the access gate.
pub const ADMIN_ROLE: &str = "admin";

/// The singleton `app_settings` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
  pub image_provider: String,
  pub payment_link: Option<String>,
  pub updated_at: Option<DateTime<Utc>>,
  pub updated_by: Option<Uuid>,
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      image_provider: DEFAULT_IMAGE_PROVIDER.to_string(),
      payment_link: None,
      updated_at: None,
      updated_by: None,
    }
  }
}
