// mapofus/src/store/memory.rs

//! In-process collaborators. Used by the test suites, the benchmarks and for
//! running the server without external services.

use super::{
  AdminGrantStore, BlobStore, CouponStore, MailMessage, MailReceipt, Mailer, OrderStore, SessionProvider,
  SettingsStore,
};
use crate::error::{MapError, MapResult};
use crate::lifecycle::counts_against_quota;
use crate::model::coupon::normalize_code;
use crate::model::{AppSettings, Coupon, Identity, Order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
  orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
  }

  fn check_invoice_unique(orders: &HashMap<Uuid, Order>, order: &Order) -> MapResult<()> {
    let Some(invoice) = order.invoice_number.as_deref() else {
      return Ok(());
    };
    let clash = orders
      .values()
      .any(|other| other.id != order.id && other.invoice_number.as_deref() == Some(invoice));
    if clash {
      return Err(MapError::invalid_field("invoice_number", "This invoice number is already in use"));
    }
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn insert(&self, order: &Order) -> MapResult<Order> {
    let mut orders = self.orders.write();
    if orders.contains_key(&order.id) {
      return Err(MapError::Persistence(format!("duplicate order id {}", order.id)));
    }
    Self::check_invoice_unique(&orders, order)?;
    orders.insert(order.id, order.clone());
    Ok(order.clone())
  }

  async fn update(&self, order: &Order) -> MapResult<Order> {
    let mut orders = self.orders.write();
    if !orders.contains_key(&order.id) {
      return Err(MapError::NotFound("Map".to_string()));
    }
    Self::check_invoice_unique(&orders, order)?;
    orders.insert(order.id, order.clone());
    Ok(order.clone())
  }

  async fn find_by_id(&self, id: Uuid) -> MapResult<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn list_by_owner(&self, user_id: Uuid) -> MapResult<Vec<Order>> {
    let owned = self
      .orders
      .read()
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    Ok(Self::newest_first(owned))
  }

  async fn list_all(&self) -> MapResult<Vec<Order>> {
    let all = self.orders.read().values().cloned().collect();
    Ok(Self::newest_first(all))
  }

  async fn latest_created_at(&self, user_id: Uuid) -> MapResult<Option<DateTime<Utc>>> {
    Ok(
      self
        .orders
        .read()
        .values()
        .filter(|o| o.user_id == user_id)
        .map(|o| o.created_at)
        .max(),
    )
  }

  async fn count_unpaid_by_owner(&self, user_id: Uuid) -> MapResult<i64> {
    let count = self
      .orders
      .read()
      .values()
      .filter(|o| o.user_id == user_id && counts_against_quota(o))
      .count();
    Ok(count as i64)
  }

  async fn count_by_coupon(&self, code: &str) -> MapResult<i64> {
    let count = self
      .orders
      .read()
      .values()
      .filter(|o| o.coupon_code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code)))
      .count();
    Ok(count as i64)
  }

  async fn invoice_taken(&self, invoice_number: &str, excluding: Uuid) -> MapResult<bool> {
    Ok(
      self
        .orders
        .read()
        .values()
        .any(|o| o.id != excluding && o.invoice_number.as_deref() == Some(invoice_number)),
    )
  }
}

/// Grants keyed by user id. `set_unavailable(true)` makes every lookup fail,
/// as a database outage would.
#[derive(Debug, Default)]
pub struct MemoryAdminGrants {
  grants: RwLock<HashMap<Uuid, String>>,
  unavailable: AtomicBool,
  lookups: AtomicUsize,
}

impl MemoryAdminGrants {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn grant(&self, user_id: Uuid, role: &str) {
    self.grants.write().insert(user_id, role.to_string());
  }

  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  /// Number of `role_for` calls so far, failed ones included.
  pub fn lookups(&self) -> usize {
    self.lookups.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl AdminGrantStore for MemoryAdminGrants {
  async fn role_for(&self, user_id: Uuid) -> MapResult<Option<String>> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(MapError::Persistence("admin grant store unavailable".to_string()));
    }
    Ok(self.grants.read().get(&user_id).cloned())
  }
}

#[derive(Debug, Default)]
pub struct MemoryCoupons {
  coupons: RwLock<HashMap<String, Coupon>>,
}

impl MemoryCoupons {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, coupon: Coupon) {
    self.coupons.write().insert(normalize_code(&coupon.code), coupon);
  }
}

#[async_trait]
impl CouponStore for MemoryCoupons {
  async fn find(&self, code: &str) -> MapResult<Option<Coupon>> {
    Ok(self.coupons.read().get(&normalize_code(code)).cloned())
  }
}

#[derive(Debug, Default)]
pub struct MemorySettings {
  row: RwLock<Option<AppSettings>>,
}

impl MemorySettings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(settings: AppSettings) -> Self {
    Self {
      row: RwLock::new(Some(settings)),
    }
  }
}

#[async_trait]
impl SettingsStore for MemorySettings {
  async fn get(&self) -> MapResult<Option<AppSettings>> {
    Ok(self.row.read().clone())
  }

  async fn upsert(&self, settings: &AppSettings) -> MapResult<AppSettings> {
    *self.row.write() = Some(settings.clone());
    Ok(settings.clone())
  }
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
  pub bytes: Vec<u8>,
  pub content_type: String,
}

/// Keeps uploaded objects in memory and serves them under `base_url`.
#[derive(Debug)]
pub struct MemoryBlobStore {
  base_url: String,
  objects: RwLock<HashMap<String, StoredBlob>>,
  fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      objects: RwLock::new(HashMap::new()),
      fail_uploads: AtomicBool::new(false),
    }
  }

  pub fn set_fail_uploads(&self, fail: bool) {
    self.fail_uploads.store(fail, Ordering::SeqCst);
  }

  pub fn get(&self, path: &str) -> Option<StoredBlob> {
    self.objects.read().get(path).cloned()
  }

  pub fn paths(&self) -> Vec<String> {
    let mut paths: Vec<String> = self.objects.read().keys().cloned().collect();
    paths.sort();
    paths
  }
}

impl Default for MemoryBlobStore {
  fn default() -> Self {
    Self::new("memory://maps")
  }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
  async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> MapResult<String> {
    if self.fail_uploads.load(Ordering::SeqCst) {
      return Err(MapError::Persistence(format!("upload of '{path}' rejected")));
    }
    self.objects.write().insert(
      path.to_string(),
      StoredBlob {
        bytes,
        content_type: content_type.to_string(),
      },
    );
    Ok(self.public_url(path))
  }

  fn public_url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }
}

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct MemoryMailer {
  outbox: RwLock<Vec<MailMessage>>,
  fail: AtomicBool,
}

impl MemoryMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_failing(&self, fail: bool) {
    self.fail.store(fail, Ordering::SeqCst);
  }

  pub fn sent(&self) -> Vec<MailMessage> {
    self.outbox.read().clone()
  }
}

#[async_trait]
impl Mailer for MemoryMailer {
  async fn send(&self, message: &MailMessage) -> MapResult<MailReceipt> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(MapError::provider("mailer", None, "outbox unavailable"));
    }
    let mut outbox = self.outbox.write();
    outbox.push(message.clone());
    Ok(MailReceipt {
      ok: true,
      message_id: Some(format!("memory-{}", outbox.len())),
    })
  }
}

/// Maps opaque tokens to identities.
#[derive(Debug, Default)]
pub struct StaticSessions {
  sessions: RwLock<HashMap<String, Identity>>,
}

impl StaticSessions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, token: &str, identity: Identity) {
    self.sessions.write().insert(token.to_string(), identity);
  }
}

#[async_trait]
impl SessionProvider for StaticSessions {
  async fn resolve(&self, access_token: &str) -> MapResult<Option<Identity>> {
    Ok(self.sessions.read().get(access_token).cloned())
  }
}
