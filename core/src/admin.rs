// mapofus/src/admin.rs

//! Operations behind the admin panel. Every call starts with `require_admin`.

use crate::access::AdminGate;
use crate::error::{MapError, MapResult};
use crate::lifecycle::{self, AdminUpdate};
use crate::model::{AppSettings, Identity, Order, OrderStatus};
use crate::providers::ImageProviderRegistry;
use crate::store::Backends;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
  #[serde(default)]
  pub image_provider: Option<String>,
  /// An empty string clears the link.
  #[serde(default)]
  pub payment_link: Option<String>,
}

/// Admin order update as it arrives over the wire. `status` is the
/// pre-migration field; only `"completed"` is still honoured.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUpdateRequest {
  #[serde(default)]
  pub order_status: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub admin_notes: Option<String>,
}

impl TryFrom<AdminUpdateRequest> for AdminUpdate {
  type Error = MapError;

  fn try_from(request: AdminUpdateRequest) -> Result<Self, Self::Error> {
    let order_status = request
      .order_status
      .as_deref()
      .map(str::parse::<OrderStatus>)
      .transpose()?;
    Ok(AdminUpdate {
      order_status,
      legacy_status: request.status,
      admin_notes: request.admin_notes,
    })
  }
}

#[derive(Clone)]
pub struct AdminService {
  backends: Backends,
  gate: AdminGate,
  providers: ImageProviderRegistry,
}

impl AdminService {
  pub fn new(backends: Backends, gate: AdminGate, providers: ImageProviderRegistry) -> Self {
    Self {
      backends,
      gate,
      providers,
    }
  }

  pub fn gate(&self) -> &AdminGate {
    &self.gate
  }

  #[instrument(name = "AdminService::list_orders", skip_all, fields(user_id = %identity.user_id), err(Display))]
  pub async fn list_orders(&self, identity: &Identity) -> MapResult<Vec<Order>> {
    self.gate.require_admin(identity).await?;
    self.backends.orders.list_all().await
  }

  #[instrument(name = "AdminService::update_order", skip_all, fields(order_id = %id, admin_id = %identity.user_id), err(Display))]
  pub async fn update_order(&self, identity: &Identity, id: Uuid, update: &AdminUpdate) -> MapResult<Order> {
    self.gate.require_admin(identity).await?;
    self.apply_update(identity, id, update).await
  }

  /// Authorizes first, so a non-admin never learns whether the body parsed.
  #[instrument(name = "AdminService::update_order_request", skip_all, fields(order_id = %id, admin_id = %identity.user_id), err(Display))]
  pub async fn update_order_request(
    &self,
    identity: &Identity,
    id: Uuid,
    request: AdminUpdateRequest,
  ) -> MapResult<Order> {
    self.gate.require_admin(identity).await?;
    let update = AdminUpdate::try_from(request)?;
    self.apply_update(identity, id, &update).await
  }

  async fn apply_update(&self, identity: &Identity, id: Uuid, update: &AdminUpdate) -> MapResult<Order> {
    let mut order = self
      .backends
      .orders
      .find_by_id(id)
      .await?
      .ok_or_else(|| MapError::NotFound("Map".to_string()))?;
    let from = order.order_status;
    lifecycle::apply_admin_update(&mut order, update, identity.user_id, Utc::now())?;
    let saved = self.backends.orders.update(&order).await?;
    info!(%from, to = %saved.order_status, "Admin updated order.");
    Ok(saved)
  }

  #[instrument(name = "AdminService::settings", skip_all, err(Display))]
  pub async fn settings(&self, identity: &Identity) -> MapResult<AppSettings> {
    self.gate.require_admin(identity).await?;
    Ok(self.backends.settings.get().await?.unwrap_or_default())
  }

  #[instrument(name = "AdminService::update_settings", skip_all, fields(admin_id = %identity.user_id), err(Display))]
  pub async fn update_settings(&self, identity: &Identity, update: &SettingsUpdate) -> MapResult<AppSettings> {
    self.gate.require_admin(identity).await?;
    if update.image_provider.is_none() && update.payment_link.is_none() {
      return Err(MapError::validation("Nothing to update"));
    }

    let mut settings = self.backends.settings.get().await?.unwrap_or_default();
    if let Some(provider) = update.image_provider.as_deref().map(str::trim) {
      if !self.providers.contains(provider) {
        return Err(MapError::invalid_field(
          "image_provider",
          format!("Unknown image provider '{provider}'. Expected one of: {}", self.providers.names().join(", ")),
        ));
      }
      settings.image_provider = provider.to_string();
    }
    if let Some(link) = update.payment_link.as_deref().map(str::trim) {
      settings.payment_link = (!link.is_empty()).then(|| link.to_string());
    }
    settings.updated_at = Some(Utc::now());
    settings.updated_by = Some(identity.user_id);

    let saved = self.backends.settings.upsert(&settings).await?;
    info!(provider = %saved.image_provider, "App settings updated.");
    Ok(saved)
  }
}
