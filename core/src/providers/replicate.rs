// mapofus/src/providers/replicate.rs
use super::{fetch_image, response_json_or_error, transport_error, GeneratedImage, ImageProvider};
use crate::error::{MapError, MapResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

pub const PROVIDER_NAME: &str = "replicate";
pub const ASPECT_RATIO: &str = "1:1";

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
  pub api_token: String,
  pub api_base: String,
  /// `owner/name` of the hosted model.
  pub model: String,
  pub timeout: Duration,
  pub poll_interval: Duration,
}

impl ReplicateConfig {
  pub fn new(api_token: impl Into<String>) -> Self {
    Self {
      api_token: api_token.into(),
      api_base: "https://api.replicate.com/v1".to_string(),
      model: "black-forest-labs/flux-schnell".to_string(),
      timeout: Duration::from_secs(120),
      poll_interval: Duration::from_secs(1),
    }
  }
}

/// Collects image URLs from the shapes model outputs come in: a bare string,
/// an object exposing `url`, or arrays of either.
fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
  match value {
    Value::String(url) => {
      let trimmed = url.trim();
      if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
        out.push(trimmed.to_string());
      }
    }
    Value::Array(rows) => {
      for row in rows {
        extract_output_urls(row, out);
      }
    }
    Value::Object(obj) => {
      if let Some(url) = obj.get("url") {
        extract_output_urls(url, out);
      }
    }
    _ => {}
  }
}

fn prediction_status(prediction: &Value) -> String {
  prediction
    .get("status")
    .and_then(Value::as_str)
    .map(str::to_ascii_lowercase)
    .unwrap_or_default()
}

fn prediction_error(prediction: &Value) -> String {
  prediction
    .get("error")
    .and_then(Value::as_str)
    .map(str::to_string)
    .unwrap_or_else(|| "prediction failed".to_string())
}

pub struct ReplicateProvider {
  config: ReplicateConfig,
  http: reqwest::Client,
}

impl ReplicateProvider {
  pub fn new(config: ReplicateConfig) -> MapResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| MapError::Internal(format!("failed to build Replicate HTTP client: {e}")))?;
    Ok(Self { config, http })
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/models/{}/predictions",
      self.config.api_base.trim_end_matches('/'),
      self.config.model
    )
  }

  async fn poll(&self, poll_url: &str) -> MapResult<Value> {
    let started = Instant::now();
    loop {
      tokio::time::sleep(self.config.poll_interval).await;
      let response = self
        .http
        .get(poll_url)
        .bearer_auth(&self.config.api_token)
        .send()
        .await
        .map_err(|e| transport_error(PROVIDER_NAME, e))?;
      let prediction = response_json_or_error(PROVIDER_NAME, response).await?;
      match prediction_status(&prediction).as_str() {
        "succeeded" => return Ok(prediction),
        "failed" | "canceled" => {
          return Err(MapError::provider(PROVIDER_NAME, None, prediction_error(&prediction)));
        }
        _ => {}
      }
      if started.elapsed() >= self.config.timeout {
        return Err(MapError::provider(
          PROVIDER_NAME,
          None,
          format!("prediction did not finish within {}s", self.config.timeout.as_secs()),
        ));
      }
    }
  }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
  fn name(&self) -> &str {
    PROVIDER_NAME
  }

  #[instrument(name = "ReplicateProvider::generate", skip_all, fields(model = %self.config.model), err(Display))]
  async fn generate(&self, prompt: &str) -> MapResult<GeneratedImage> {
    let payload = json!({
      "input": {
        "prompt": prompt,
        "aspect_ratio": ASPECT_RATIO,
        "output_format": "png",
      }
    });
    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.config.api_token)
      .header("Prefer", "wait")
      .json(&payload)
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER_NAME, e))?;
    let mut prediction = response_json_or_error(PROVIDER_NAME, response).await?;

    match prediction_status(&prediction).as_str() {
      "succeeded" => {}
      "starting" | "processing" => {
        let poll_url = prediction
          .pointer("/urls/get")
          .and_then(Value::as_str)
          .map(str::trim)
          .filter(|url| !url.is_empty())
          .map(str::to_string)
          .ok_or_else(|| MapError::provider(PROVIDER_NAME, None, "prediction missing poll URL"))?;
        debug!(%poll_url, "Prediction still running, polling.");
        prediction = self.poll(&poll_url).await?;
      }
      _ => return Err(MapError::provider(PROVIDER_NAME, None, prediction_error(&prediction))),
    }

    let mut urls = Vec::new();
    if let Some(output) = prediction.get("output") {
      extract_output_urls(output, &mut urls);
    }
    let url = urls
      .into_iter()
      .next()
      .ok_or_else(|| MapError::provider(PROVIDER_NAME, None, "response returned no image URL"))?;
    fetch_image(&self.http, PROVIDER_NAME, &url).await
  }
}
