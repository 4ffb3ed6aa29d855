// tests/generation_tests.rs
mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use mapofus::model::{AppSettings, Coupon, ImageVariant, OrderStatus, PaymentStatus, QaAnswer};
use mapofus::store::{OrderStore, SettingsStore};
use mapofus::{GenerationPolicy, MapError};
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn new_user_gets_a_pending_order_with_four_variants() {
  let h = Harness::new();
  let user = h.user();

  let order = h.generation.create_order(&user, request(150)).await.unwrap();

  assert_eq!(order.order_status, OrderStatus::Pending);
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.user_id, user.user_id);
  assert_eq!(order.image_urls.len(), 4);
  for variant in ImageVariant::ALL {
    assert!(order.image_urls.contains_key(&variant), "missing {variant:?}");
  }
  assert_eq!(order.thumbnail_url, order.image_urls.get(&ImageVariant::Thumbnail).cloned());
  assert_eq!(order.hd_image_url, order.image_urls.get(&ImageVariant::Poster).cloned());
  assert_eq!(order.image_provider, "openai");
  assert!(order.ai_prompt.contains("MAP OF US"));

  let stored = h.orders.find_by_id(order.id).await.unwrap();
  assert_eq!(stored, Some(order.clone()));

  let paths = h.blobs.paths();
  assert_eq!(paths.len(), 4);
  let stamp = order.created_at.timestamp_millis();
  assert!(paths.contains(&format!("{}/{}-poster.jpg", user.user_id, stamp)));
  assert!(paths.contains(&format!("{}/{}-base.png", user.user_id, stamp)));
  let base = h.blobs.get(&format!("{}/{}-base.png", user.user_id, stamp)).unwrap();
  assert_eq!(base.content_type, "image/png");
}

#[tokio::test]
#[serial]
async fn story_hints_flow_into_prompt_and_metadata() {
  let h = Harness::new();
  let user = h.user();
  let mut req = request(120);
  req.locations = Some("Lisbon, Porto".into());
  req.theme = Some("romantic".into());
  req.qa_answers = vec![QaAnswer {
    question: "First trip?".into(),
    answer: "Sintra by train".into(),
  }];

  let order = h.generation.create_order(&user, req).await.unwrap();
  assert!(order.ai_prompt.contains("Priority locations or labels to weave in: Lisbon, Porto."));
  assert!(order.ai_prompt.contains("First trip?: Sintra by train"));
  assert_eq!(order.story_metadata.locations.as_deref(), Some("Lisbon, Porto"));
}

#[tokio::test]
#[serial]
async fn invalid_input_writes_nothing_and_skips_provider() {
  let h = Harness::new();
  let err = h.generation.create_order(&h.user(), request(20)).await.unwrap_err();
  assert!(matches!(err, MapError::Validation { field: Some(ref f), .. } if f == "story_text"));
  assert_eq!(h.openai.call_count(), 0);
  assert!(h.blobs.paths().is_empty());
  assert!(h.orders.list_all().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn quota_boundary() {
  let h = Harness::new();
  let user = h.user();
  for _ in 0..2 {
    h.seed_old_order(&user, OrderStatus::Pending).await;
  }
  // Paid and cancelled orders do not count.
  h.seed_old_order(&user, OrderStatus::Completed).await;
  h.seed_old_order(&user, OrderStatus::Cancelled).await;

  // unpaid == limit - 1
  h.generation.create_order(&user, request(150)).await.unwrap();

  // unpaid == limit; the quota check runs before the cooldown check
  let other = h.user();
  let err = h.generation.create_order(&user, request(150)).await.unwrap_err();
  assert!(matches!(err, MapError::QuotaExceeded { limit: 3 }));
  assert_eq!(err.status_code(), 403);

  // Another user is unaffected.
  assert!(h.generation.create_order(&other, request(150)).await.is_ok());
}

#[tokio::test]
#[serial]
async fn quota_rejection_happens_before_generation() {
  let h = Harness::new();
  let user = h.user();
  for _ in 0..3 {
    h.seed_old_order(&user, OrderStatus::InvoiceSubmitted).await;
  }
  assert!(h.generation.create_order(&user, request(150)).await.is_err());
  assert_eq!(h.openai.call_count(), 0);
  assert_eq!(h.orders.list_by_owner(user.user_id).await.unwrap().len(), 3);
}

#[tokio::test]
#[serial]
async fn legacy_paid_flag_frees_quota() {
  let h = Harness::new();
  let user = h.user();
  for _ in 0..3 {
    let mut order = h.seed_old_order(&user, OrderStatus::Pending).await;
    order.payment_status = PaymentStatus::Completed;
    h.orders.update(&order).await.unwrap();
  }
  assert!(h.generation.create_order(&user, request(150)).await.is_ok());
}

#[tokio::test]
#[serial]
async fn coupon_usage_boundary() {
  let h = Harness::new();
  h.put_coupon("DUO", Some(2));

  // used == max - 1
  let early = h.user();
  let mut seeded = h.seed_old_order(&early, OrderStatus::Completed).await;
  seeded.coupon_code = Some("DUO".into());
  h.orders.update(&seeded).await.unwrap();

  let mut req = request(150);
  req.coupon_code = Some("duo".into());
  let order = h.generation.create_order(&h.user(), req.clone()).await.unwrap();
  assert_eq!(order.coupon_code.as_deref(), Some("DUO"));
  assert_eq!(order.coupon_discount_percent, Some(20));

  // used == max
  let err = h.generation.create_order(&h.user(), req).await.unwrap_err();
  assert!(matches!(err, MapError::Validation { field: Some(ref f), .. } if f == "coupon_code"));
}

#[tokio::test]
#[serial]
async fn coupon_stored_in_lower_case_still_applies() {
  let h = Harness::new();
  h.put_coupon("spring24", Some(1));

  let mut req = request(150);
  req.coupon_code = Some("Spring24".into());
  let order = h.generation.create_order(&h.user(), req.clone()).await.unwrap();
  assert_eq!(order.coupon_code.as_deref(), Some("SPRING24"));
  assert_eq!(order.coupon_discount_percent, Some(20));

  // The single use is counted against the lower-case row too.
  let err = h.generation.create_order(&h.user(), req).await.unwrap_err();
  assert!(matches!(err, MapError::Validation { field: Some(ref f), .. } if f == "coupon_code"));
}

#[tokio::test]
#[serial]
async fn unknown_inactive_or_expired_coupons_are_rejected() {
  let h = Harness::new();
  h.coupons.put(Coupon {
    code: "OFF".into(),
    discount_percent: 10,
    max_uses: None,
    active: false,
    expires_at: None,
  });
  h.coupons.put(Coupon {
    code: "OLD".into(),
    discount_percent: 10,
    max_uses: None,
    active: true,
    expires_at: Some(Utc::now() - ChronoDuration::days(1)),
  });
  for code in ["NOPE", "OFF", "OLD"] {
    let mut req = request(150);
    req.coupon_code = Some(code.into());
    let err = h.generation.create_order(&h.user(), req).await.unwrap_err();
    assert!(matches!(err, MapError::Validation { .. }), "{code}");
  }
  assert_eq!(h.openai.call_count(), 0);
}

#[tokio::test]
#[serial]
async fn cooldown_rejects_rapid_second_order_with_retry_hint() {
  let h = Harness::new();
  let user = h.user();
  h.generation.create_order(&user, request(150)).await.unwrap();

  let err = h.generation.create_order(&user, request(150)).await.unwrap_err();
  match err {
    MapError::RateLimit { retry_after_secs: Some(secs) } => assert!((1..=30).contains(&secs)),
    other => panic!("expected rate limit, got {other:?}"),
  }
  assert_eq!(h.openai.call_count(), 1);
}

#[tokio::test]
#[serial]
async fn cooldown_elapsed_allows_next_order() {
  let h = Harness::with_policy(GenerationPolicy {
    free_limit: 3,
    cooldown: Duration::from_secs(30),
  });
  let user = h.user();
  h.seed_order(&user, OrderStatus::Pending, Utc::now() - ChronoDuration::seconds(31)).await;
  assert!(h.generation.create_order(&user, request(150)).await.is_ok());

  let recent = h.user();
  h.seed_order(&recent, OrderStatus::Pending, Utc::now() - ChronoDuration::seconds(5)).await;
  assert!(matches!(
    h.generation.create_order(&recent, request(150)).await,
    Err(MapError::RateLimit { .. })
  ));
}

#[tokio::test]
#[serial]
async fn provider_failure_persists_nothing() {
  let h = Harness::new();
  h.openai.fail.store(true, std::sync::atomic::Ordering::SeqCst);
  let user = h.user();
  let err = h.generation.create_order(&user, request(150)).await.unwrap_err();
  assert!(matches!(err, MapError::Provider { status: Some(503), .. }));
  assert!(h.orders.list_by_owner(user.user_id).await.unwrap().is_empty());
  assert!(h.blobs.paths().is_empty());
}

#[tokio::test]
#[serial]
async fn upload_failure_persists_nothing() {
  let h = Harness::new();
  h.blobs.set_fail_uploads(true);
  let user = h.user();
  let err = h.generation.create_order(&user, request(150)).await.unwrap_err();
  assert_eq!(err.status_code(), 500);
  assert!(h.orders.list_by_owner(user.user_id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn configured_provider_is_used() {
  let h = Harness::new();
  h.settings
    .upsert(&AppSettings {
      image_provider: "replicate".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  let order = h.generation.create_order(&h.user(), request(150)).await.unwrap();
  assert_eq!(order.image_provider, "replicate");
  assert_eq!(h.replicate.call_count(), 1);
  assert_eq!(h.openai.call_count(), 0);
}

#[tokio::test]
#[serial]
async fn unknown_configured_provider_falls_back_to_default() {
  let h = Harness::new();
  h.settings
    .upsert(&AppSettings {
      image_provider: "retired-backend".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  let order = h.generation.create_order(&h.user(), request(150)).await.unwrap();
  assert_eq!(order.image_provider, "openai");
}

#[tokio::test]
#[serial]
async fn owner_is_notified_after_creation() {
  let h = Harness::new();
  let user = h.user();
  let order = h.generation.create_order(&user, request(150)).await.unwrap();
  settle().await;
  let sent = h.mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(Some(sent[0].to.clone()), user.email);
  assert!(sent[0].text.contains(&format!("https://mapofus.test/preview/{}", order.id)));
}

#[tokio::test]
#[serial]
async fn notification_failure_never_fails_the_order() {
  let h = Harness::new();
  h.mailer.set_failing(true);
  let user = h.user();
  let order = h.generation.create_order(&user, request(150)).await.unwrap();
  settle().await;
  assert!(h.mailer.sent().is_empty());
  assert!(h.orders.find_by_id(order.id).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn identity_without_email_skips_notification() {
  let h = Harness::new();
  let mut user = h.user();
  user.email = None;
  h.generation.create_order(&user, request(150)).await.unwrap();
  settle().await;
  assert!(h.mailer.sent().is_empty());
}
