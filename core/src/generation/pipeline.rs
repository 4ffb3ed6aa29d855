// mapofus/src/generation/pipeline.rs

//! Step handlers of the create-order pipeline.
//!
//! Order of the steps is the failure policy: every check runs before the
//! provider is called, and nothing is written to the order store until all
//! four variants are uploaded.

use super::GenerationCtxData;
use crate::error::{MapError, MapResult};
use crate::flow::{ContextData, PipelineControl, SkipCondition};
use crate::imaging::derive_variants;
use crate::lifecycle;
use crate::model::coupon::normalize_code;
use crate::model::{ImageVariant, Order, OrderStatus, PaymentStatus};
use crate::pipeline::Pipeline;
use crate::prompt::build_prompt;
use crate::validation::validate_create_order;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type Ctx = ContextData<GenerationCtxData>;

pub const STEPS: [&str; 9] = [
  "validate_input",
  "enforce_quota",
  "apply_coupon",
  "enforce_cooldown",
  "build_prompt",
  "generate_image",
  "derive_and_upload",
  "persist_order",
  "notify_owner",
];

pub fn build_generation_pipeline() -> Pipeline<GenerationCtxData, MapError> {
  let no_coupon: SkipCondition<GenerationCtxData> = Arc::new(|ctx: Ctx| !ctx.read().wants_coupon());
  let no_email: SkipCondition<GenerationCtxData> = Arc::new(|ctx: Ctx| ctx.read().identity.email.is_none());

  let mut p = Pipeline::<GenerationCtxData, MapError>::new(&[
    ("validate_input", false, None),
    ("enforce_quota", false, None),
    ("apply_coupon", false, Some(no_coupon)),
    ("enforce_cooldown", false, None),
    ("build_prompt", false, None),
    ("generate_image", false, None),
    ("derive_and_upload", false, None),
    ("persist_order", false, None),
    ("notify_owner", true, Some(no_email)),
  ]);

  p.on_root("validate_input", |ctx: Ctx| Box::pin(validate_input(ctx)));
  p.on_root("enforce_quota", |ctx: Ctx| Box::pin(enforce_quota(ctx)));
  p.on_root("apply_coupon", |ctx: Ctx| Box::pin(apply_coupon(ctx)));
  p.on_root("enforce_cooldown", |ctx: Ctx| Box::pin(enforce_cooldown(ctx)));
  p.on_root("build_prompt", |ctx: Ctx| Box::pin(build_prompt_step(ctx)));
  p.on_root("generate_image", |ctx: Ctx| Box::pin(generate_image(ctx)));
  p.on_root("derive_and_upload", |ctx: Ctx| Box::pin(derive_and_upload(ctx)));
  p.on_root("persist_order", |ctx: Ctx| Box::pin(persist_order(ctx)));
  p.on_root("notify_owner", |ctx: Ctx| Box::pin(notify_owner(ctx)));
  p
}

fn missing(what: &str) -> MapError {
  MapError::Internal(format!("{what} missing from generation context"))
}

async fn validate_input(ctx: Ctx) -> MapResult<PipelineControl> {
  let input = validate_create_order(&ctx.read().request)?;
  ctx.write().input = Some(input);
  Ok(PipelineControl::Continue)
}

async fn enforce_quota(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, user_id) = ctx.snapshot(|d| (d.deps.clone(), d.identity.user_id));
  let unpaid = deps.backends.orders.count_unpaid_by_owner(user_id).await?;
  let limit = deps.policy.free_limit;
  debug!(unpaid, limit, "Checked unpaid order quota.");
  if unpaid >= i64::from(limit) {
    return Err(MapError::QuotaExceeded { limit });
  }
  Ok(PipelineControl::Continue)
}

async fn apply_coupon(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, code, now) = ctx.snapshot(|d| {
    (
      d.deps.clone(),
      d.input.as_ref().and_then(|i| i.coupon_code.clone()),
      d.started_at,
    )
  });
  let code = code.ok_or_else(|| missing("coupon code"))?;
  let invalid = || MapError::invalid_field("coupon_code", "Coupon is invalid or no longer available");

  let coupon = deps.backends.coupons.find(&code).await?.ok_or_else(invalid)?;
  if !coupon.active || coupon.is_expired(now) {
    return Err(invalid());
  }
  let used = deps.backends.orders.count_by_coupon(&code).await?;
  if !coupon.has_capacity(used) {
    return Err(invalid());
  }
  info!(coupon = %code, discount = coupon.discount_percent, "Coupon applied.");
  ctx.write().coupon = Some(coupon);
  Ok(PipelineControl::Continue)
}

async fn enforce_cooldown(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, user_id, now) = ctx.snapshot(|d| (d.deps.clone(), d.identity.user_id, d.started_at));
  let Some(latest) = deps.backends.orders.latest_created_at(user_id).await? else {
    return Ok(PipelineControl::Continue);
  };
  let cooldown = deps.policy.cooldown;
  // A timestamp from the future counts as "just now".
  let elapsed = (now - latest).to_std().unwrap_or(Duration::ZERO);
  if elapsed < cooldown {
    let remaining = cooldown - elapsed;
    let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    return Err(MapError::RateLimit {
      retry_after_secs: Some(retry_after_secs.max(1)),
    });
  }
  Ok(PipelineControl::Continue)
}

async fn build_prompt_step(ctx: Ctx) -> MapResult<PipelineControl> {
  let prompt = {
    let guard = ctx.read();
    let input = guard.input.as_ref().ok_or_else(|| missing("validated input"))?;
    build_prompt(&input.story_text, &input.metadata)
  };
  ctx.write().prompt = Some(prompt);
  Ok(PipelineControl::Continue)
}

async fn generate_image(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, prompt) = ctx.snapshot(|d| (d.deps.clone(), d.prompt.clone()));
  let prompt = prompt.ok_or_else(|| missing("prompt"))?;

  let configured = match deps.backends.settings.get().await {
    Ok(settings) => settings.map(|s| s.image_provider),
    Err(e) => {
      warn!(error = %e, "Could not read app settings, using default image provider.");
      None
    }
  };
  let provider = deps.providers.resolve(configured.as_deref())?;
  info!(provider = provider.name(), "Generating image.");
  let image = provider.generate(&prompt).await?;
  debug!(bytes = image.bytes.len(), content_type = %image.content_type, "Image generated.");
  ctx.write().image = Some(image);
  Ok(PipelineControl::Continue)
}

async fn derive_and_upload(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, image, user_id, started_at) =
    ctx.snapshot(|d| (d.deps.clone(), d.image.clone(), d.identity.user_id, d.started_at));
  let image = image.ok_or_else(|| missing("generated image"))?;
  let spec = deps.derivation.clone();

  let variants = tokio::task::spawn_blocking(move || derive_variants(&image, &spec))
    .await
    .map_err(|e| MapError::Internal(format!("variant derivation task failed: {e}")))??;

  let stamp = started_at.timestamp_millis();
  let mut urls = std::collections::BTreeMap::new();
  for variant in &variants {
    let path = format!("{}/{}-{}.{}", user_id, stamp, variant.variant.as_str(), variant.extension);
    let url = deps
      .backends
      .blobs
      .upload(&path, variant.bytes.clone(), &variant.content_type)
      .await?;
    debug!(%path, "Uploaded variant.");
    urls.insert(variant.variant, url);
  }

  let mut guard = ctx.write();
  guard.variants = variants;
  guard.image_urls = urls;
  Ok(PipelineControl::Continue)
}

async fn persist_order(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, order) = {
    let guard = ctx.read();
    let input = guard.input.as_ref().ok_or_else(|| missing("validated input"))?;
    let image = guard.image.as_ref().ok_or_else(|| missing("generated image"))?;
    let order = Order {
      id: guard.order_id,
      user_id: guard.identity.user_id,
      story_text: input.story_text.clone(),
      story_metadata: input.metadata.clone(),
      coupon_code: guard.coupon.as_ref().map(|c| normalize_code(&c.code)),
      coupon_discount_percent: guard.coupon.as_ref().map(|c| c.discount_percent),
      image_urls: guard.image_urls.clone(),
      thumbnail_url: guard.image_urls.get(&ImageVariant::Thumbnail).cloned(),
      hd_image_url: guard.image_urls.get(&ImageVariant::Poster).cloned(),
      ai_prompt: guard.prompt.clone().unwrap_or_default(),
      image_provider: image.provider.clone(),
      order_status: OrderStatus::Pending,
      payment_status: PaymentStatus::mirror_of(OrderStatus::Pending),
      invoice_number: None,
      invoice_submitted_at: None,
      payment_verified_at: None,
      payment_verified_by: None,
      downloaded_at: None,
      admin_notes: None,
      created_at: guard.started_at,
      updated_at: guard.started_at,
    };
    (guard.deps.clone(), order)
  };
  debug_assert!(lifecycle::counts_against_quota(&order));

  let stored = deps.backends.orders.insert(&order).await.map_err(|e| match e {
    MapError::Persistence(detail) => {
      warn!(%detail, "Order insert failed.");
      MapError::Persistence("Failed to save map".to_string())
    }
    other => other,
  })?;
  ctx.write().order = Some(stored);
  Ok(PipelineControl::Continue)
}

async fn notify_owner(ctx: Ctx) -> MapResult<PipelineControl> {
  let (deps, order, email) = ctx.snapshot(|d| (d.deps.clone(), d.order.clone(), d.identity.email.clone()));
  if let (Some(order), Some(email)) = (order, email) {
    deps.notifier.dispatch_map_ready(&order, &email);
  }
  Ok(PipelineControl::Continue)
}
