// mapofus/src/notify.rs

//! "Your map is ready" mail, sent on a detached task.

use crate::model::Order;
use crate::store::{MailMessage, Mailer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

#[derive(Clone)]
pub struct Notifier {
  mailer: Arc<dyn Mailer>,
  app_base_url: String,
}

impl Notifier {
  pub fn new(mailer: Arc<dyn Mailer>, app_base_url: impl Into<String>) -> Self {
    Self {
      mailer,
      app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
    }
  }

  pub fn map_ready_message(&self, order: &Order, to: &str) -> MailMessage {
    let link = format!("{}/preview/{}", self.app_base_url, order.id);
    MailMessage {
      to: to.to_string(),
      subject: "Your Map of Us is ready".to_string(),
      text: format!("Your map has been generated. Preview it here: {link}"),
      html: format!(
        "<p>Your map has been generated.</p><p><a href=\"{link}\">Preview your map</a></p>"
      ),
    }
  }

  /// Fire-and-forget. The returned handle may be dropped; failures are only logged.
  pub fn dispatch_map_ready(&self, order: &Order, to: &str) -> JoinHandle<()> {
    let message = self.map_ready_message(order, to);
    let mailer = self.mailer.clone();
    let span = tracing::info_span!("notify_map_ready", order_id = %order.id);
    tokio::spawn(
      async move {
        match mailer.send(&message).await {
          Ok(receipt) if receipt.ok => info!(message_id = ?receipt.message_id, "Map-ready mail sent."),
          Ok(_) => warn!("Mailer declined the map-ready mail."),
          Err(e) => warn!(error = %e, "Map-ready mail failed."),
        }
      }
      .instrument(span),
    )
  }
}
