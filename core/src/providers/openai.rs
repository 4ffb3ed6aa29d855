// mapofus/src/providers/openai.rs
use super::{fetch_image, response_json_or_error, sniff_content_type, transport_error, GeneratedImage, ImageProvider};
use crate::error::{MapError, MapResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

pub const PROVIDER_NAME: &str = "openai";
pub const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  pub api_key: String,
  pub api_base: String,
  pub model: String,
  pub timeout: Duration,
}

impl OpenAiConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      api_base: "https://api.openai.com/v1".to_string(),
      model: "gpt-image-1".to_string(),
      timeout: Duration::from_secs(120),
    }
  }
}

/// Where the generated bytes live in an images response.
#[derive(Debug, PartialEq, Eq)]
enum ImagePayload {
  Inline(String),
  Remote(String),
}

fn extract_payload(response: &Value) -> Option<ImagePayload> {
  let first = response.get("data")?.as_array()?.first()?;
  let non_empty = |key: &str| {
    first
      .get(key)
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_string)
  };
  non_empty("b64_json")
    .map(ImagePayload::Inline)
    .or_else(|| non_empty("url").map(ImagePayload::Remote))
}

pub struct OpenAiProvider {
  config: OpenAiConfig,
  http: reqwest::Client,
}

impl OpenAiProvider {
  pub fn new(config: OpenAiConfig) -> MapResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| MapError::Internal(format!("failed to build OpenAI HTTP client: {e}")))?;
    Ok(Self { config, http })
  }

  fn endpoint(&self) -> String {
    format!("{}/images/generations", self.config.api_base.trim_end_matches('/'))
  }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
  fn name(&self) -> &str {
    PROVIDER_NAME
  }

  #[instrument(name = "OpenAiProvider::generate", skip_all, fields(model = %self.config.model), err(Display))]
  async fn generate(&self, prompt: &str) -> MapResult<GeneratedImage> {
    let payload = json!({
      "model": self.config.model,
      "prompt": prompt,
      "size": IMAGE_SIZE,
      "n": 1,
    });
    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.config.api_key)
      .json(&payload)
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER_NAME, e))?;
    let body = response_json_or_error(PROVIDER_NAME, response).await?;

    match extract_payload(&body) {
      Some(ImagePayload::Inline(b64)) => {
        let bytes = BASE64
          .decode(b64.as_bytes())
          .map_err(|e| MapError::provider(PROVIDER_NAME, None, format!("invalid base64 image: {e}")))?;
        debug!(bytes = bytes.len(), "Decoded inline image.");
        Ok(GeneratedImage {
          content_type: sniff_content_type(&bytes),
          bytes,
          provider: PROVIDER_NAME.to_string(),
        })
      }
      Some(ImagePayload::Remote(url)) => fetch_image(&self.http, PROVIDER_NAME, &url).await,
      None => Err(MapError::provider(PROVIDER_NAME, None, "response contained no image data")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn inline_payload_wins_over_url() {
    let body = json!({ "data": [{ "b64_json": "aGk=", "url": "https://x/y.png" }] });
    assert_eq!(extract_payload(&body), Some(ImagePayload::Inline("aGk=".into())));
  }

  #[test]
  fn url_payload_is_used_when_inline_missing() {
    let body = json!({ "data": [{ "url": "https://cdn.example/img.png" }] });
    assert_eq!(
      extract_payload(&body),
      Some(ImagePayload::Remote("https://cdn.example/img.png".into()))
    );
  }

  #[test]
  fn empty_data_has_no_payload() {
    assert_eq!(extract_payload(&json!({ "data": [] })), None);
    assert_eq!(extract_payload(&json!({ "data": [{ "b64_json": "" }] })), None);
    assert_eq!(extract_payload(&json!({ "created": 1 })), None);
  }
}
