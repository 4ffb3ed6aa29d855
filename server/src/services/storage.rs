// mapofus-server/src/services/storage.rs

//! Blob storage over the Supabase storage REST API.

use crate::config::SupabaseConfig;
use async_trait::async_trait;
use mapofus::providers::{transport_error, upstream_message};
use mapofus::store::BlobStore;
use mapofus::{MapError, MapResult};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

const SERVICE: &str = "storage";

pub struct SupabaseStorage {
  client: reqwest::Client,
  base_url: String,
  bucket: String,
  service_key: String,
}

impl SupabaseStorage {
  pub fn new(client: reqwest::Client, config: &SupabaseConfig) -> Self {
    Self {
      client,
      base_url: config.url.clone(),
      bucket: config.storage_bucket.clone(),
      service_key: config.service_role_key.clone(),
    }
  }

  fn object_url(&self, path: &str) -> String {
    format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
  }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
  #[instrument(name = "SupabaseStorage::upload", skip(self, bytes), fields(size = bytes.len()), err(Display))]
  async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> MapResult<String> {
    let response = self
      .client
      .post(self.object_url(path))
      .bearer_auth(&self.service_key)
      .header("apikey", &self.service_key)
      .header(CONTENT_TYPE, content_type)
      .header("x-upsert", "false")
      .body(bytes)
      .send()
      .await
      .map_err(|e| transport_error(SERVICE, e))?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(MapError::provider(SERVICE, Some(status.as_u16()), upstream_message(&body)));
    }
    debug!("Object stored.");
    Ok(self.public_url(path))
  }

  fn public_url(&self, path: &str) -> String {
    format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn public_url_uses_bucket_path() {
    let storage = SupabaseStorage::new(
      reqwest::Client::new(),
      &SupabaseConfig {
        url: "https://proj.supabase.co".into(),
        service_role_key: "svc".into(),
        anon_key: "anon".into(),
        storage_bucket: "maps".into(),
      },
    );
    assert_eq!(
      storage.public_url("u1/1700000000000-poster.jpg"),
      "https://proj.supabase.co/storage/v1/object/public/maps/u1/1700000000000-poster.jpg"
    );
    assert_eq!(
      storage.object_url("u1/a.png"),
      "https://proj.supabase.co/storage/v1/object/maps/u1/a.png"
    );
  }
}
