// mapofus-server/src/services/mailer.rs

use crate::config::MailConfig;
use async_trait::async_trait;
use mapofus::providers::{response_json_or_error, transport_error};
use mapofus::store::{MailMessage, MailReceipt, Mailer};
use mapofus::MapResult;
use serde_json::json;
use tracing::{instrument, warn};

const SERVICE: &str = "resend";
const RESEND_URL: &str = "https://api.resend.com/emails";

struct ResendCredentials {
  api_key: String,
  from: String,
}

/// Transactional mail through Resend. Without an API key and sender it
/// reports `ok: false` for every message instead of failing.
pub struct ResendMailer {
  client: reqwest::Client,
  credentials: Option<ResendCredentials>,
}

impl ResendMailer {
  pub fn new(client: reqwest::Client, config: &MailConfig) -> Self {
    let credentials = match (&config.resend_api_key, &config.from) {
      (Some(api_key), Some(from)) => Some(ResendCredentials {
        api_key: api_key.clone(),
        from: from.clone(),
      }),
      _ => {
        warn!("Mailer not configured: missing RESEND_API_KEY or MAIL_FROM");
        None
      }
    };
    Self { client, credentials }
  }

  pub fn is_configured(&self) -> bool {
    self.credentials.is_some()
  }
}

#[async_trait]
impl Mailer for ResendMailer {
  #[instrument(name = "ResendMailer::send", skip_all, fields(to = %message.to), err(Display))]
  async fn send(&self, message: &MailMessage) -> MapResult<MailReceipt> {
    let Some(credentials) = &self.credentials else {
      warn!("Mailer not configured, message dropped.");
      return Ok(MailReceipt::default());
    };
    let response = self
      .client
      .post(RESEND_URL)
      .bearer_auth(&credentials.api_key)
      .json(&json!({
        "from": credentials.from,
        "to": [message.to],
        "subject": message.subject,
        "text": message.text,
        "html": message.html,
      }))
      .send()
      .await
      .map_err(|e| transport_error(SERVICE, e))?;
    let payload = response_json_or_error(SERVICE, response).await?;
    Ok(MailReceipt {
      ok: true,
      message_id: payload.get("id").and_then(|v| v.as_str()).map(str::to_string),
    })
  }
}
