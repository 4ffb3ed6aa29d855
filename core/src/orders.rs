// mapofus/src/orders.rs

//! Owner-facing order operations and the public share view.

use crate::access::ensure_owner;
use crate::error::{MapError, MapResult};
use crate::lifecycle;
use crate::model::{Identity, ImageVariant, Order, OrderStatus, PaymentStatus, StoryMetadata};
use crate::store::Backends;
use crate::validation::validate_invoice_number;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// An order as shown on its preview page.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPreview {
  pub order: Order,
  pub payment_link: Option<String>,
}

/// The public projection served on share links. Never carries the
/// high-resolution URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedMap {
  pub id: Uuid,
  pub story_text: String,
  pub thumbnail_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub order_status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub story_metadata: StoryMetadata,
}

impl From<Order> for SharedMap {
  fn from(order: Order) -> Self {
    Self {
      id: order.id,
      story_text: order.story_text,
      thumbnail_url: order.thumbnail_url,
      created_at: order.created_at,
      order_status: order.order_status,
      payment_status: order.payment_status,
      story_metadata: order.story_metadata,
    }
  }
}

#[derive(Clone)]
pub struct OrderService {
  backends: Backends,
}

impl OrderService {
  pub fn new(backends: Backends) -> Self {
    Self { backends }
  }

  async fn load(&self, id: Uuid) -> MapResult<Order> {
    self
      .backends
      .orders
      .find_by_id(id)
      .await?
      .ok_or_else(|| MapError::NotFound("Map".to_string()))
  }

  #[instrument(name = "OrderService::get_for_owner", skip_all, fields(order_id = %id, user_id = %identity.user_id), err(Display))]
  pub async fn get_for_owner(&self, identity: &Identity, id: Uuid) -> MapResult<OrderPreview> {
    let order = self.load(id).await?;
    ensure_owner(&order, identity)?;
    let payment_link = match self.backends.settings.get().await {
      Ok(settings) => settings.and_then(|s| s.payment_link),
      Err(e) => {
        warn!(error = %e, "Could not read payment link.");
        None
      }
    };
    Ok(OrderPreview { order, payment_link })
  }

  #[instrument(name = "OrderService::list_mine", skip_all, fields(user_id = %identity.user_id), err(Display))]
  pub async fn list_mine(&self, identity: &Identity) -> MapResult<Vec<Order>> {
    self.backends.orders.list_by_owner(identity.user_id).await
  }

  /// Owner reports an externally issued invoice number.
  ///
  /// A missing order and someone else's order are reported identically.
  #[instrument(name = "OrderService::submit_invoice", skip_all, fields(order_id = %id, user_id = %identity.user_id), err(Display))]
  pub async fn submit_invoice(&self, identity: &Identity, id: Uuid, invoice_number: &str) -> MapResult<Order> {
    let invoice_number = validate_invoice_number(invoice_number)?;
    let mut order = match self.backends.orders.find_by_id(id).await? {
      Some(order) if order.is_owned_by(identity.user_id) => order,
      _ => return Err(MapError::validation("Map not found or access denied")),
    };

    lifecycle::submit_invoice(&mut order, &invoice_number, Utc::now())?;

    if self.backends.orders.invoice_taken(&invoice_number, order.id).await? {
      return Err(MapError::invalid_field("invoice_number", "This invoice number is already in use"));
    }
    let saved = self.backends.orders.update(&order).await?;
    info!(invoice = %invoice_number, "Invoice submitted.");
    Ok(saved)
  }

  /// Returns the URL to redirect the owner to.
  ///
  /// Recording the download is best effort and never fails the call.
  #[instrument(name = "OrderService::download", skip_all, fields(order_id = %id, user_id = %identity.user_id), err(Display))]
  pub async fn download(&self, identity: &Identity, id: Uuid) -> MapResult<String> {
    let mut order = self.load(id).await?;
    ensure_owner(&order, identity)?;
    if !lifecycle::is_download_eligible(&order) {
      return Err(MapError::PaymentRequired("Payment required before download".to_string()));
    }
    let url = order
      .hd_image_url
      .clone()
      .or_else(|| order.image_urls.get(&ImageVariant::Poster).cloned())
      .ok_or_else(|| MapError::NotFound("High-resolution image".to_string()))?;

    if lifecycle::record_download(&mut order, Utc::now()) {
      if let Err(e) = self.backends.orders.update(&order).await {
        warn!(error = %e, "Failed to record download.");
      }
    }
    Ok(url)
  }

  /// Unauthenticated.
  #[instrument(name = "OrderService::share", skip(self), err(Display))]
  pub async fn share(&self, id: Uuid) -> MapResult<SharedMap> {
    self.load(id).await.map(SharedMap::from)
  }
}
