// tests/order_flow_tests.rs
mod common;

use common::*;
use mapofus::lifecycle::INVOICE_BLOCKED;
use mapofus::model::{AppSettings, OrderStatus, PaymentStatus};
use mapofus::store::{OrderStore, SettingsStore};
use mapofus::{AdminUpdate, MapError};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn owner_submits_invoice_once() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::Pending).await;

  let updated = h.order_service.submit_invoice(&owner, order.id, "INV-001").await.unwrap();
  assert_eq!(updated.order_status, OrderStatus::InvoiceSubmitted);
  assert_eq!(updated.invoice_number.as_deref(), Some("INV-001"));
  assert!(updated.invoice_submitted_at.is_some());

  let err = h.order_service.submit_invoice(&owner, order.id, "INV-002").await.unwrap_err();
  assert!(matches!(err, MapError::Validation { .. }));
  let stored = h.orders.find_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(stored.invoice_number.as_deref(), Some("INV-001"));
}

#[tokio::test]
#[serial]
async fn invoice_blocked_for_every_post_submission_status() {
  let h = Harness::new();
  let owner = h.user();
  for status in INVOICE_BLOCKED {
    let order = h.seed_old_order(&owner, status).await;
    let err = h
      .order_service
      .submit_invoice(&owner, order.id, &format!("INV-{}", status.as_str()).replace('_', "-"))
      .await
      .unwrap_err();
    assert!(matches!(err, MapError::Validation { .. }), "{status}");
  }
}

#[tokio::test]
#[serial]
async fn invoice_for_missing_or_foreign_order_is_a_validation_error() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::Pending).await;

  let stranger = h.user();
  let err = h.order_service.submit_invoice(&stranger, order.id, "INV-9").await.unwrap_err();
  assert!(matches!(err, MapError::Validation { .. }));
  let err = h
    .order_service
    .submit_invoice(&owner, uuid::Uuid::new_v4(), "INV-9")
    .await
    .unwrap_err();
  assert!(matches!(err, MapError::Validation { .. }));
  assert_eq!(
    h.orders.find_by_id(order.id).await.unwrap().unwrap().order_status,
    OrderStatus::Pending
  );
}

#[tokio::test]
#[serial]
async fn invoice_numbers_are_unique_across_orders() {
  let h = Harness::new();
  let a = h.user();
  let b = h.user();
  let first = h.seed_old_order(&a, OrderStatus::Pending).await;
  let second = h.seed_old_order(&b, OrderStatus::Pending).await;

  h.order_service.submit_invoice(&a, first.id, "INV-777").await.unwrap();
  let err = h.order_service.submit_invoice(&b, second.id, "INV-777").await.unwrap_err();
  assert!(matches!(err, MapError::Validation { field: Some(ref f), .. } if f == "invoice_number"));
}

#[tokio::test]
#[serial]
async fn malformed_invoice_numbers_are_rejected() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::Pending).await;
  for bad in ["", "ab", "INV 1", "INV#1"] {
    assert!(h.order_service.submit_invoice(&owner, order.id, bad).await.is_err(), "{bad:?}");
  }
}

#[tokio::test]
#[serial]
async fn admin_confirmation_makes_order_downloadable() {
  let h = Harness::new();
  let owner = h.user();
  let admin = h.admin();
  let order = h.seed_old_order(&owner, OrderStatus::Pending).await;
  h.order_service.submit_invoice(&owner, order.id, "INV-100").await.unwrap();

  let verifying = AdminUpdate {
    order_status: Some(OrderStatus::PaymentVerifying),
    ..Default::default()
  };
  let o = h.admin_service.update_order(&admin, order.id, &verifying).await.unwrap();
  assert_eq!(o.order_status, OrderStatus::PaymentVerifying);

  let confirm = AdminUpdate {
    order_status: Some(OrderStatus::PaymentConfirmed),
    ..Default::default()
  };
  let o = h.admin_service.update_order(&admin, order.id, &confirm).await.unwrap();
  assert_eq!(o.order_status, OrderStatus::ReadyForDownload);
  assert_eq!(o.payment_status, PaymentStatus::Completed);
  assert_eq!(o.payment_verified_by, Some(admin.user_id));
  assert!(o.payment_verified_at.is_some());

  let stored = h.orders.find_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order_status, OrderStatus::ReadyForDownload);
}

#[tokio::test]
#[serial]
async fn download_redirects_to_poster_and_completes_order() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::ReadyForDownload).await;

  let url = h.order_service.download(&owner, order.id).await.unwrap();
  assert_eq!(Some(url), order.hd_image_url);

  let after = h.orders.find_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(after.order_status, OrderStatus::Completed);
  assert!(after.downloaded_at.is_some());

  // Later downloads keep working and keep the first timestamp.
  h.order_service.download(&owner, order.id).await.unwrap();
  let again = h.orders.find_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(again.downloaded_at, after.downloaded_at);
}

#[tokio::test]
#[serial]
async fn download_requires_payment() {
  let h = Harness::new();
  let owner = h.user();
  for status in [OrderStatus::Pending, OrderStatus::InvoiceSubmitted, OrderStatus::PaymentRejected] {
    let order = h.seed_old_order(&owner, status).await;
    let err = h.order_service.download(&owner, order.id).await.unwrap_err();
    assert_eq!(err.status_code(), 402, "{status}");
  }
}

#[tokio::test]
#[serial]
async fn legacy_payment_flag_alone_allows_download() {
  let h = Harness::new();
  let owner = h.user();
  let mut order = h.seed_old_order(&owner, OrderStatus::Pending).await;
  order.payment_status = PaymentStatus::Completed;
  h.orders.update(&order).await.unwrap();
  assert!(h.order_service.download(&owner, order.id).await.is_ok());
}

#[tokio::test]
#[serial]
async fn invoice_on_legacy_paid_order_keeps_download_right() {
  let h = Harness::new();
  let owner = h.user();
  let mut order = h.seed_old_order(&owner, OrderStatus::Pending).await;
  order.payment_status = PaymentStatus::Completed;
  h.orders.update(&order).await.unwrap();
  assert!(h.order_service.download(&owner, order.id).await.is_ok());

  let err = h
    .order_service
    .submit_invoice(&owner, order.id, "INV-LEGACY")
    .await
    .unwrap_err();
  assert!(matches!(err, MapError::Validation { .. }));

  let stored = h.orders.find_by_id(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order_status, OrderStatus::Pending);
  assert_eq!(stored.payment_status, PaymentStatus::Completed);
  assert!(stored.invoice_number.is_none());
  assert!(h.order_service.download(&owner, order.id).await.is_ok());
}

#[tokio::test]
#[serial]
async fn download_and_preview_are_owner_only_even_for_admins() {
  let h = Harness::new();
  let owner = h.user();
  let admin = h.admin();
  let order = h.seed_old_order(&owner, OrderStatus::ReadyForDownload).await;

  for caller in [h.user(), admin] {
    let err = h.order_service.download(&caller, order.id).await.unwrap_err();
    assert!(matches!(err, MapError::Authorization(_)));
    let err = h.order_service.get_for_owner(&caller, order.id).await.unwrap_err();
    assert!(matches!(err, MapError::Authorization(_)));
  }
  let err = h.order_service.download(&owner, uuid::Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.status_code(), 404);
}

#[tokio::test]
#[serial]
async fn preview_carries_payment_link() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::Pending).await;

  let preview = h.order_service.get_for_owner(&owner, order.id).await.unwrap();
  assert_eq!(preview.payment_link, None);

  h.settings
    .upsert(&AppSettings {
      payment_link: Some("https://pay.example/map".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  let preview = h.order_service.get_for_owner(&owner, order.id).await.unwrap();
  assert_eq!(preview.payment_link.as_deref(), Some("https://pay.example/map"));
  assert_eq!(preview.order.id, order.id);
}

#[tokio::test]
#[serial]
async fn dashboard_lists_own_orders_newest_first() {
  let h = Harness::new();
  let owner = h.user();
  let older = h.seed_order(&owner, OrderStatus::Completed, chrono::Utc::now() - chrono::Duration::days(2)).await;
  let newer = h.seed_old_order(&owner, OrderStatus::Pending).await;
  h.seed_old_order(&h.user(), OrderStatus::Pending).await;

  let mine = h.order_service.list_mine(&owner).await.unwrap();
  let ids: Vec<_> = mine.iter().map(|o| o.id).collect();
  assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
#[serial]
async fn share_projection_hides_high_resolution_url() {
  let h = Harness::new();
  let owner = h.user();
  let order = h.seed_old_order(&owner, OrderStatus::Completed).await;

  let shared = h.order_service.share(order.id).await.unwrap();
  assert_eq!(shared.id, order.id);
  assert_eq!(shared.thumbnail_url, order.thumbnail_url);

  let json = serde_json::to_value(&shared).unwrap();
  let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
  assert!(!keys.contains(&"hd_image_url"));
  assert!(!keys.contains(&"image_urls"));
  assert!(!json.to_string().contains("poster"));
}
