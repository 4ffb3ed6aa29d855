// mapofus-server/src/db/coupons.rs

use super::persistence;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mapofus::model::Coupon;
use mapofus::store::CouponStore;
use mapofus::MapResult;
use sqlx::{FromRow, PgPool};

// Codes may have been inserted by hand in any case.
const FIND_COUPON: &str =
  "SELECT code, discount_percent, max_uses, active, expires_at FROM coupons WHERE upper(code) = upper($1)";

#[derive(Debug, FromRow)]
struct CouponRow {
  code: String,
  discount_percent: i32,
  max_uses: Option<i64>,
  active: bool,
  expires_at: Option<DateTime<Utc>>,
}

impl From<CouponRow> for Coupon {
  fn from(row: CouponRow) -> Self {
    Coupon {
      code: row.code,
      discount_percent: row.discount_percent,
      max_uses: row.max_uses,
      active: row.active,
      expires_at: row.expires_at,
    }
  }
}

#[derive(Clone)]
pub struct PgCoupons {
  pool: PgPool,
}

impl PgCoupons {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl CouponStore for PgCoupons {
  async fn find(&self, code: &str) -> MapResult<Option<Coupon>> {
    let row: Option<CouponRow> = sqlx::query_as(FIND_COUPON)
      .bind(code)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| persistence("find coupon", e))?;
    Ok(row.map(Coupon::from))
  }
}
