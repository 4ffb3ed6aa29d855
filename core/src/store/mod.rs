// mapofus/src/store/mod.rs

//! Collaborator contracts: the relational store, blob storage, the session
//! provider and the transactional mailer.
//!
//! The domain only ever talks to these traits. `memory` holds in-process
//! implementations; the server crate provides the Postgres and HTTP ones.

pub mod memory;

use crate::error::MapResult;
use crate::model::{AppSettings, Coupon, Identity, Order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert(&self, order: &Order) -> MapResult<Order>;

  /// Writes every mutable field of `order` by id.
  ///
  /// Implementations must reject an `invoice_number` already held by another
  /// order with a `Validation` error.
  async fn update(&self, order: &Order) -> MapResult<Order>;

  async fn find_by_id(&self, id: Uuid) -> MapResult<Option<Order>>;

  /// Newest first.
  async fn list_by_owner(&self, user_id: Uuid) -> MapResult<Vec<Order>>;

  /// Newest first.
  async fn list_all(&self) -> MapResult<Vec<Order>>;

  async fn latest_created_at(&self, user_id: Uuid) -> MapResult<Option<DateTime<Utc>>>;

  /// Orders of `user_id` for which [`crate::lifecycle::counts_against_quota`] holds.
  async fn count_unpaid_by_owner(&self, user_id: Uuid) -> MapResult<i64>;

  async fn count_by_coupon(&self, code: &str) -> MapResult<i64>;

  /// Whether an order other than `excluding` already holds `invoice_number`.
  async fn invoice_taken(&self, invoice_number: &str, excluding: Uuid) -> MapResult<bool>;
}

#[async_trait]
pub trait AdminGrantStore: Send + Sync {
  /// The granted role, or `None` when the user has no grant.
  async fn role_for(&self, user_id: Uuid) -> MapResult<Option<String>>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
  async fn find(&self, code: &str) -> MapResult<Option<Coupon>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
  /// `None` when the singleton row has never been written.
  async fn get(&self) -> MapResult<Option<AppSettings>>;
  async fn upsert(&self, settings: &AppSettings) -> MapResult<AppSettings>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
  /// Uploads and returns the object's public URL.
  async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> MapResult<String>;
  fn public_url(&self, path: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
  pub to: String,
  pub subject: String,
  pub text: String,
  pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailReceipt {
  pub ok: bool,
  pub message_id: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: &MailMessage) -> MapResult<MailReceipt>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
  /// Resolves an access token; `None` for unknown or expired tokens.
  async fn resolve(&self, access_token: &str) -> MapResult<Option<Identity>>;
}

/// The bundle of collaborators the services run against.
#[derive(Clone)]
pub struct Backends {
  pub orders: Arc<dyn OrderStore>,
  pub grants: Arc<dyn AdminGrantStore>,
  pub coupons: Arc<dyn CouponStore>,
  pub settings: Arc<dyn SettingsStore>,
  pub blobs: Arc<dyn BlobStore>,
  pub mailer: Arc<dyn Mailer>,
}
