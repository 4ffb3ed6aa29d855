// mapofus-server/src/db/orders.rs

use super::{is_unique_violation, persistence};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mapofus::model::{ImageVariant, Order, OrderStatus, PaymentStatus, StoryMetadata};
use mapofus::store::OrderStore;
use mapofus::{MapError, MapResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, story_text, story_metadata, coupon_code, coupon_discount_percent, \
   image_urls, thumbnail_url, hd_image_url, ai_prompt, image_provider, order_status, payment_status, \
   invoice_number, invoice_submitted_at, payment_verified_at, payment_verified_by, downloaded_at, \
   admin_notes, created_at, updated_at";

const INVOICE_UNIQUE: &str = "orders_invoice_number_key";

/// Statuses that are neither paid nor cancelled; kept in step with
/// `lifecycle::counts_against_quota`.
const UNPAID_FILTER: &str = "order_status NOT IN ('ready_for_download', 'completed', 'cancelled') \
   AND payment_status <> 'completed'";

#[derive(Debug, FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  story_text: String,
  story_metadata: Json<StoryMetadata>,
  coupon_code: Option<String>,
  coupon_discount_percent: Option<i32>,
  image_urls: Json<BTreeMap<ImageVariant, String>>,
  thumbnail_url: Option<String>,
  hd_image_url: Option<String>,
  ai_prompt: String,
  image_provider: String,
  order_status: String,
  payment_status: String,
  invoice_number: Option<String>,
  invoice_submitted_at: Option<DateTime<Utc>>,
  payment_verified_at: Option<DateTime<Utc>>,
  payment_verified_by: Option<Uuid>,
  downloaded_at: Option<DateTime<Utc>>,
  admin_notes: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = MapError;

  fn try_from(row: OrderRow) -> MapResult<Self> {
    let order_status = row
      .order_status
      .parse::<OrderStatus>()
      .map_err(|e| MapError::Persistence(format!("order {}: {}", row.id, e)))?;
    let payment_status = row
      .payment_status
      .parse::<PaymentStatus>()
      .map_err(|e| MapError::Persistence(format!("order {}: {}", row.id, e)))?;
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      story_text: row.story_text,
      story_metadata: row.story_metadata.0,
      coupon_code: row.coupon_code,
      coupon_discount_percent: row.coupon_discount_percent,
      image_urls: row.image_urls.0,
      thumbnail_url: row.thumbnail_url,
      hd_image_url: row.hd_image_url,
      ai_prompt: row.ai_prompt,
      image_provider: row.image_provider,
      order_status,
      payment_status,
      invoice_number: row.invoice_number,
      invoice_submitted_at: row.invoice_submitted_at,
      payment_verified_at: row.payment_verified_at,
      payment_verified_by: row.payment_verified_by,
      downloaded_at: row.downloaded_at,
      admin_notes: row.admin_notes,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn into_orders(rows: Vec<OrderRow>) -> MapResult<Vec<Order>> {
  rows.into_iter().map(Order::try_from).collect()
}

fn invoice_clash() -> MapError {
  MapError::invalid_field("invoice_number", "This invoice number is already in use")
}

#[derive(Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "PgOrderStore::insert", skip_all, fields(order_id = %order.id))]
  async fn insert(&self, order: &Order) -> MapResult<Order> {
    let sql = format!(
      "INSERT INTO orders ({ORDER_COLUMNS}) VALUES \
       ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21) \
       RETURNING {ORDER_COLUMNS}"
    );
    let row: OrderRow = sqlx::query_as(&sql)
      .bind(order.id)
      .bind(order.user_id)
      .bind(&order.story_text)
      .bind(Json(&order.story_metadata))
      .bind(&order.coupon_code)
      .bind(order.coupon_discount_percent)
      .bind(Json(&order.image_urls))
      .bind(&order.thumbnail_url)
      .bind(&order.hd_image_url)
      .bind(&order.ai_prompt)
      .bind(&order.image_provider)
      .bind(order.order_status.as_str())
      .bind(order.payment_status.as_str())
      .bind(&order.invoice_number)
      .bind(order.invoice_submitted_at)
      .bind(order.payment_verified_at)
      .bind(order.payment_verified_by)
      .bind(order.downloaded_at)
      .bind(&order.admin_notes)
      .bind(order.created_at)
      .bind(order.updated_at)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| persistence("insert order", e))?;
    row.try_into()
  }

  #[instrument(name = "PgOrderStore::update", skip_all, fields(order_id = %order.id))]
  async fn update(&self, order: &Order) -> MapResult<Order> {
    let sql = format!(
      "UPDATE orders SET image_urls = $2, thumbnail_url = $3, hd_image_url = $4, order_status = $5, \
       payment_status = $6, invoice_number = $7, invoice_submitted_at = $8, payment_verified_at = $9, \
       payment_verified_by = $10, downloaded_at = $11, admin_notes = $12, updated_at = $13 \
       WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(order.id)
      .bind(Json(&order.image_urls))
      .bind(&order.thumbnail_url)
      .bind(&order.hd_image_url)
      .bind(order.order_status.as_str())
      .bind(order.payment_status.as_str())
      .bind(&order.invoice_number)
      .bind(order.invoice_submitted_at)
      .bind(order.payment_verified_at)
      .bind(order.payment_verified_by)
      .bind(order.downloaded_at)
      .bind(&order.admin_notes)
      .bind(order.updated_at)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| {
        if is_unique_violation(&e, INVOICE_UNIQUE) {
          invoice_clash()
        } else {
          persistence("update order", e)
        }
      })?;
    row.ok_or_else(|| MapError::NotFound("Map".to_string()))?.try_into()
  }

  async fn find_by_id(&self, id: Uuid) -> MapResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| persistence("find order", e))?;
    row.map(Order::try_from).transpose()
  }

  async fn list_by_owner(&self, user_id: Uuid) -> MapResult<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC");
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| persistence("list orders", e))?;
    into_orders(rows)
  }

  async fn list_all(&self) -> MapResult<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| persistence("list all orders", e))?;
    into_orders(rows)
  }

  async fn latest_created_at(&self, user_id: Uuid) -> MapResult<Option<DateTime<Utc>>> {
    sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(created_at) FROM orders WHERE user_id = $1")
      .bind(user_id)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| persistence("latest order", e))
  }

  async fn count_unpaid_by_owner(&self, user_id: Uuid) -> MapResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND {UNPAID_FILTER}");
    sqlx::query_scalar::<_, i64>(&sql)
      .bind(user_id)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| persistence("count unpaid orders", e))
  }

  async fn count_by_coupon(&self, code: &str) -> MapResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE upper(coupon_code) = upper($1)")
      .bind(code)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| persistence("count coupon uses", e))
  }

  async fn invoice_taken(&self, invoice_number: &str, excluding: Uuid) -> MapResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM orders WHERE invoice_number = $1 AND id <> $2)")
      .bind(invoice_number)
      .bind(excluding)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| persistence("check invoice number", e))
  }
}
