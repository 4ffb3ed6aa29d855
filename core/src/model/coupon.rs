// mapofus/src/model/coupon.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
  pub code: String,
  pub discount_percent: i32,
  /// `None` means unlimited.
  pub max_uses: Option<i64>,
  pub active: bool,
  /// `None` means the coupon never expires.
  pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|at| at <= now)
  }

  /// `used` is the number of orders already referencing this code.
  pub fn has_capacity(&self, used: i64) -> bool {
    self.max_uses.map_or(true, |max| used < max)
  }
}

/// Coupon codes are matched case-insensitively; stored and compared upper-case.
pub fn normalize_code(raw: &str) -> String {
  raw.trim().to_ascii_uppercase()
}
