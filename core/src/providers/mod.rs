// mapofus/src/providers/mod.rs

//! Image-generation backends behind one interface.
//!
//! Every backend returns the same [`GeneratedImage`]; which backend runs is
//! decided by looking a name up in the [`ImageProviderRegistry`].

pub mod openai;
pub mod replicate;

use crate::error::{MapError, MapResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use replicate::{ReplicateConfig, ReplicateProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
  pub bytes: Vec<u8>,
  pub content_type: String,
  /// Name of the backend that produced the image.
  pub provider: String,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
  fn name(&self) -> &str;
  async fn generate(&self, prompt: &str) -> MapResult<GeneratedImage>;
}

#[derive(Clone)]
pub struct ImageProviderRegistry {
  providers: BTreeMap<String, Arc<dyn ImageProvider>>,
  default_provider: String,
}

impl ImageProviderRegistry {
  pub fn new(default_provider: impl Into<String>) -> Self {
    Self {
      providers: BTreeMap::new(),
      default_provider: default_provider.into(),
    }
  }

  pub fn register(&mut self, provider: Arc<dyn ImageProvider>) {
    self.providers.insert(provider.name().to_string(), provider);
  }

  pub fn with(mut self, provider: Arc<dyn ImageProvider>) -> Self {
    self.register(provider);
    self
  }

  pub fn contains(&self, name: &str) -> bool {
    self.providers.contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    self.providers.keys().cloned().collect()
  }

  pub fn default_name(&self) -> &str {
    &self.default_provider
  }

  /// The named provider, or the default when `name` is absent or unknown.
  pub fn resolve(&self, name: Option<&str>) -> MapResult<Arc<dyn ImageProvider>> {
    if let Some(requested) = name {
      if let Some(provider) = self.providers.get(requested) {
        return Ok(provider.clone());
      }
      warn!(requested, default = %self.default_provider, "Unknown image provider, using default.");
    }
    self.providers.get(&self.default_provider).cloned().ok_or_else(|| {
      MapError::Internal(format!(
        "default image provider '{}' is not registered",
        self.default_provider
      ))
    })
  }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
  if value.chars().count() <= max_chars {
    return value.to_string();
  }
  value.chars().take(max_chars).collect::<String>() + "…"
}

pub fn transport_error(provider: &str, err: reqwest::Error) -> MapError {
  let status = err.status().map(|s| s.as_u16());
  let message = if err.is_timeout() {
    "request timed out".to_string()
  } else {
    err.to_string()
  };
  MapError::provider(provider, status, message)
}

/// Pulls a human-readable message out of a provider error body.
pub fn upstream_message(body: &str) -> String {
  let parsed: Option<Value> = serde_json::from_str(body).ok();
  parsed
    .as_ref()
    .and_then(|v| {
      v.pointer("/error/message")
        .or_else(|| v.get("detail"))
        .or_else(|| v.get("error"))
        .and_then(Value::as_str)
    })
    .map(str::to_string)
    .unwrap_or_else(|| truncate_text(body.trim(), 512))
}

pub async fn response_json_or_error(provider: &str, response: reqwest::Response) -> MapResult<Value> {
  let status = response.status();
  let body = response.text().await.map_err(|e| transport_error(provider, e))?;
  if !status.is_success() {
    return Err(MapError::provider(provider, Some(status.as_u16()), upstream_message(&body)));
  }
  serde_json::from_str(&body).map_err(|e| MapError::provider(provider, None, format!("invalid JSON payload: {e}")))
}

/// Best guess at a MIME type from magic bytes.
pub(crate) fn sniff_content_type(bytes: &[u8]) -> String {
  image::guess_format(bytes)
    .map(|format| format.to_mime_type().to_string())
    .unwrap_or_else(|_| "application/octet-stream".to_string())
}

pub(crate) async fn fetch_image(client: &reqwest::Client, provider: &str, url: &str) -> MapResult<GeneratedImage> {
  let response = client.get(url).send().await.map_err(|e| transport_error(provider, e))?;
  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(MapError::provider(
      provider,
      Some(status.as_u16()),
      format!("image download failed: {}", truncate_text(&body, 512)),
    ));
  }
  let header_type = response
    .headers()
    .get(CONTENT_TYPE)
    .and_then(|value| value.to_str().ok())
    .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
    .filter(|value| !value.is_empty());
  let bytes = response
    .bytes()
    .await
    .map_err(|e| transport_error(provider, e))?
    .to_vec();
  if bytes.is_empty() {
    return Err(MapError::provider(provider, None, "image download returned no bytes"));
  }
  let content_type = header_type.unwrap_or_else(|| sniff_content_type(&bytes));
  Ok(GeneratedImage {
    bytes,
    content_type,
    provider: provider.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Named(&'static str);

  #[async_trait]
  impl ImageProvider for Named {
    fn name(&self) -> &str {
      self.0
    }

    async fn generate(&self, _prompt: &str) -> MapResult<GeneratedImage> {
      Ok(GeneratedImage {
        bytes: vec![1],
        content_type: "image/png".into(),
        provider: self.0.into(),
      })
    }
  }

  #[test]
  fn resolve_falls_back_to_default() {
    let registry = ImageProviderRegistry::new("openai")
      .with(Arc::new(Named("openai")))
      .with(Arc::new(Named("replicate")));
    assert_eq!(registry.resolve(Some("replicate")).unwrap().name(), "replicate");
    assert_eq!(registry.resolve(Some("midjourney")).unwrap().name(), "openai");
    assert_eq!(registry.resolve(None).unwrap().name(), "openai");
    assert_eq!(registry.names(), vec!["openai".to_string(), "replicate".to_string()]);
  }

  #[test]
  fn missing_default_is_an_internal_error() {
    let registry = ImageProviderRegistry::new("openai").with(Arc::new(Named("replicate")));
    assert!(matches!(registry.resolve(None), Err(MapError::Internal(_))));
  }

  #[test]
  fn upstream_message_prefers_structured_error() {
    assert_eq!(upstream_message(r#"{"error":{"message":"billing hard limit"}}"#), "billing hard limit");
    assert_eq!(upstream_message(r#"{"detail":"Invalid version"}"#), "Invalid version");
    assert_eq!(upstream_message("  gateway timeout "), "gateway timeout");
  }

  #[test]
  fn sniffing_recognises_png_magic() {
    let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    assert_eq!(sniff_content_type(&png_magic), "image/png");
    assert_eq!(sniff_content_type(b"nope"), "application/octet-stream");
  }
}
