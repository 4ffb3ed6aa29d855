// mapofus/src/model/order.rs
use crate::error::{MapError, MapResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Primary lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  InvoiceSubmitted,
  PaymentVerifying,
  /// Transient: always rewritten to `ReadyForDownload` before it is stored.
  PaymentConfirmed,
  ReadyForDownload,
  Completed,
  PaymentRejected,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::InvoiceSubmitted,
    OrderStatus::PaymentVerifying,
    OrderStatus::PaymentConfirmed,
    OrderStatus::ReadyForDownload,
    OrderStatus::Completed,
    OrderStatus::PaymentRejected,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::InvoiceSubmitted => "invoice_submitted",
      OrderStatus::PaymentVerifying => "payment_verifying",
      OrderStatus::PaymentConfirmed => "payment_confirmed",
      OrderStatus::ReadyForDownload => "ready_for_download",
      OrderStatus::Completed => "completed",
      OrderStatus::PaymentRejected => "payment_rejected",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Statuses that by themselves mean the order has been paid for.
  pub fn is_paid(&self) -> bool {
    matches!(self, OrderStatus::ReadyForDownload | OrderStatus::Completed)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = MapError;

  fn from_str(s: &str) -> MapResult<Self> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| MapError::invalid_field("order_status", format!("Unknown order status '{s}'")))
  }
}

/// Legacy payment flag, mirrored from [`OrderStatus`] on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Completed,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Completed => "completed",
    }
  }

  pub fn mirror_of(status: OrderStatus) -> Self {
    if status.is_paid() {
      PaymentStatus::Completed
    } else {
      PaymentStatus::Pending
    }
  }
}

impl FromStr for PaymentStatus {
  type Err = MapError;

  fn from_str(s: &str) -> MapResult<Self> {
    match s {
      "pending" => Ok(PaymentStatus::Pending),
      "completed" => Ok(PaymentStatus::Completed),
      other => Err(MapError::invalid_field(
        "payment_status",
        format!("Unknown payment status '{other}'"),
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
  Thumbnail,
  Base,
  Poster,
  Wallpaper,
}

impl ImageVariant {
  pub const ALL: [ImageVariant; 4] = [
    ImageVariant::Thumbnail,
    ImageVariant::Base,
    ImageVariant::Poster,
    ImageVariant::Wallpaper,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ImageVariant::Thumbnail => "thumbnail",
      ImageVariant::Base => "base",
      ImageVariant::Poster => "poster",
      ImageVariant::Wallpaper => "wallpaper",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  Romantic,
  Vintage,
  Modern,
  Minimalist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAnswer {
  pub question: String,
  pub answer: String,
}

/// Structured hints stored next to the story.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub theme: Option<Theme>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub locations: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aspect_ratio: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub qa_answers: Vec<QaAnswer>,
}

/// One generated map and its payment/delivery lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub story_text: String,
  pub story_metadata: StoryMetadata,
  pub coupon_code: Option<String>,
  pub coupon_discount_percent: Option<i32>,
  pub image_urls: BTreeMap<ImageVariant, String>,
  pub thumbnail_url: Option<String>,
  pub hd_image_url: Option<String>,
  pub ai_prompt: String,
  pub image_provider: String,
  pub order_status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub invoice_number: Option<String>,
  pub invoice_submitted_at: Option<DateTime<Utc>>,
  pub payment_verified_at: Option<DateTime<Utc>>,
  pub payment_verified_by: Option<Uuid>,
  pub downloaded_at: Option<DateTime<Utc>>,
  pub admin_notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.user_id == user_id
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_strings_round_trip_through_parse() {
    for status in OrderStatus::ALL {
      assert_eq!(status.as_str().parse::<OrderStatus>().ok(), Some(status));
    }
    assert!("shipped".parse::<OrderStatus>().is_err());
  }

  #[test]
  fn payment_mirror_tracks_paid_statuses() {
    assert_eq!(PaymentStatus::mirror_of(OrderStatus::ReadyForDownload), PaymentStatus::Completed);
    assert_eq!(PaymentStatus::mirror_of(OrderStatus::Completed), PaymentStatus::Completed);
    assert_eq!(PaymentStatus::mirror_of(OrderStatus::InvoiceSubmitted), PaymentStatus::Pending);
    assert_eq!(PaymentStatus::mirror_of(OrderStatus::PaymentRejected), PaymentStatus::Pending);
  }

  #[test]
  fn image_urls_serialize_with_variant_names() {
    let mut urls = BTreeMap::new();
    urls.insert(ImageVariant::Poster, "p".to_string());
    urls.insert(ImageVariant::Thumbnail, "t".to_string());
    let json = serde_json::to_value(&urls).unwrap();
    assert_eq!(json["poster"], "p");
    assert_eq!(json["thumbnail"], "t");
  }
}
