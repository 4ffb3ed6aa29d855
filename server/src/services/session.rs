// mapofus-server/src/services/session.rs

//! Resolves access tokens against the Supabase auth API.

use crate::config::SupabaseConfig;
use async_trait::async_trait;
use mapofus::model::Identity;
use mapofus::providers::{transport_error, upstream_message};
use mapofus::store::SessionProvider;
use mapofus::{MapError, MapResult};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

const SERVICE: &str = "auth";

#[derive(Debug, Deserialize)]
struct AuthUser {
  id: Uuid,
  #[serde(default)]
  email: Option<String>,
}

impl From<AuthUser> for Identity {
  fn from(user: AuthUser) -> Self {
    Identity {
      user_id: user.id,
      email: user.email.filter(|e| !e.is_empty()),
    }
  }
}

pub struct SupabaseSessions {
  client: reqwest::Client,
  user_url: String,
  anon_key: String,
}

impl SupabaseSessions {
  pub fn new(client: reqwest::Client, config: &SupabaseConfig) -> Self {
    Self {
      client,
      user_url: format!("{}/auth/v1/user", config.url),
      anon_key: config.anon_key.clone(),
    }
  }
}

#[async_trait]
impl SessionProvider for SupabaseSessions {
  #[instrument(name = "SupabaseSessions::resolve", skip_all, err(Display))]
  async fn resolve(&self, access_token: &str) -> MapResult<Option<Identity>> {
    let response = self
      .client
      .get(&self.user_url)
      .bearer_auth(access_token)
      .header("apikey", &self.anon_key)
      .send()
      .await
      .map_err(|e| transport_error(SERVICE, e))?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      debug!(%status, "Access token rejected.");
      return Ok(None);
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(MapError::provider(SERVICE, Some(status.as_u16()), upstream_message(&body)));
    }
    let user: AuthUser = response.json().await.map_err(|e| transport_error(SERVICE, e))?;
    Ok(Some(user.into()))
  }
}
