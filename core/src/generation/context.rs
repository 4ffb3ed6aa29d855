// mapofus/src/generation/context.rs

use super::GenerationDeps;
use crate::imaging::DerivedImage;
use crate::model::{Coupon, Identity, ImageVariant, Order};
use crate::providers::GeneratedImage;
use crate::validation::{CreateOrderRequest, OrderInput};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Root data of one create-order run. Each step fills in the next field.
pub struct GenerationCtxData {
  pub deps: Arc<GenerationDeps>,
  pub identity: Identity,
  pub request: CreateOrderRequest,
  /// Fixed at the start of the run; used for cooldown, paths and timestamps.
  pub started_at: DateTime<Utc>,
  pub order_id: Uuid,

  pub input: Option<OrderInput>,
  pub coupon: Option<Coupon>,
  pub prompt: Option<String>,
  pub image: Option<GeneratedImage>,
  pub variants: Vec<DerivedImage>,
  pub image_urls: BTreeMap<ImageVariant, String>,
  pub order: Option<Order>,
}

impl GenerationCtxData {
  pub fn new(deps: Arc<GenerationDeps>, identity: Identity, request: CreateOrderRequest) -> Self {
    Self {
      deps,
      identity,
      request,
      started_at: Utc::now(),
      order_id: Uuid::new_v4(),
      input: None,
      coupon: None,
      prompt: None,
      image: None,
      variants: Vec::new(),
      image_urls: BTreeMap::new(),
      order: None,
    }
  }

  pub fn wants_coupon(&self) -> bool {
    self.input.as_ref().is_some_and(|input| input.coupon_code.is_some())
  }
}
