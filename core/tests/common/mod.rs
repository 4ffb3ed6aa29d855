// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mapofus::imaging::{DerivationSpec, VariantSpec};
use mapofus::model::{Coupon, ImageVariant, StoryMetadata, ADMIN_ROLE};
use mapofus::store::memory::{
  MemoryAdminGrants, MemoryBlobStore, MemoryCoupons, MemoryMailer, MemoryOrderStore, MemorySettings,
};
use mapofus::store::{Backends, OrderStore};
use mapofus::{
  AdminGate, AdminService, ContextData, CreateOrderRequest, FlowError, GeneratedImage, GenerationDeps,
  GenerationPolicy, GenerationService, Identity, ImageProvider, ImageProviderRegistry, MapError, MapResult,
  Notifier, Order, OrderService, OrderStatus, PaymentStatus, PipelineControl,
};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Pipeline engine fixtures ---

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    TestError::Flow(format!("{fe:?}"))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> mapofus::flow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> mapofus::flow::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fake image provider ---

pub fn render_png(width: u32, height: u32) -> Vec<u8> {
  let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 200]));
  let mut bytes = Vec::new();
  DynamicImage::ImageRgb8(img)
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    .expect("png encoding");
  bytes
}

/// Renders a small PNG instead of calling out; can be told to fail.
pub struct FakeProvider {
  name: &'static str,
  pub calls: AtomicUsize,
  pub fail: AtomicBool,
}

impl FakeProvider {
  pub fn new(name: &'static str) -> Arc<Self> {
    Arc::new(Self {
      name,
      calls: AtomicUsize::new(0),
      fail: AtomicBool::new(false),
    })
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ImageProvider for FakeProvider {
  fn name(&self) -> &str {
    self.name
  }

  async fn generate(&self, _prompt: &str) -> MapResult<GeneratedImage> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.fail.load(Ordering::SeqCst) {
      return Err(MapError::provider(self.name, Some(503), "upstream overloaded"));
    }
    Ok(GeneratedImage {
      bytes: render_png(64, 48),
      content_type: "image/png".to_string(),
      provider: self.name.to_string(),
    })
  }
}

pub fn small_derivation() -> DerivationSpec {
  DerivationSpec {
    thumbnail: VariantSpec {
      width: 16,
      height: 16,
      quality: 40,
      posterize_bits: Some(5),
    },
    poster: VariantSpec {
      width: 48,
      height: 48,
      quality: 92,
      posterize_bits: None,
    },
    wallpaper: VariantSpec {
      width: 27,
      height: 48,
      quality: 90,
      posterize_bits: None,
    },
  }
}

// --- Service harness over in-memory collaborators ---

pub struct Harness {
  pub orders: Arc<MemoryOrderStore>,
  pub grants: Arc<MemoryAdminGrants>,
  pub coupons: Arc<MemoryCoupons>,
  pub settings: Arc<MemorySettings>,
  pub blobs: Arc<MemoryBlobStore>,
  pub mailer: Arc<MemoryMailer>,
  pub openai: Arc<FakeProvider>,
  pub replicate: Arc<FakeProvider>,
  pub generation: GenerationService,
  pub order_service: OrderService,
  pub admin_service: AdminService,
}

impl Harness {
  pub fn new() -> Self {
    Self::with_policy(GenerationPolicy::default())
  }

  pub fn with_policy(policy: GenerationPolicy) -> Self {
    setup_tracing();
    let orders = Arc::new(MemoryOrderStore::new());
    let grants = Arc::new(MemoryAdminGrants::new());
    let coupons = Arc::new(MemoryCoupons::new());
    let settings = Arc::new(MemorySettings::new());
    let blobs = Arc::new(MemoryBlobStore::new("https://storage.test/maps"));
    let mailer = Arc::new(MemoryMailer::new());
    let openai = FakeProvider::new("openai");
    let replicate = FakeProvider::new("replicate");

    let backends = Backends {
      orders: orders.clone(),
      grants: grants.clone(),
      coupons: coupons.clone(),
      settings: settings.clone(),
      blobs: blobs.clone(),
      mailer: mailer.clone(),
    };
    let providers = ImageProviderRegistry::new("openai")
      .with(openai.clone())
      .with(replicate.clone());

    let generation = GenerationService::new(GenerationDeps {
      backends: backends.clone(),
      providers: providers.clone(),
      policy,
      derivation: small_derivation(),
      notifier: Notifier::new(mailer.clone(), "https://mapofus.test"),
    });
    let order_service = OrderService::new(backends.clone());
    let admin_service = AdminService::new(backends, AdminGate::new(grants.clone()), providers);

    Self {
      orders,
      grants,
      coupons,
      settings,
      blobs,
      mailer,
      openai,
      replicate,
      generation,
      order_service,
      admin_service,
    }
  }

  pub fn user(&self) -> Identity {
    let id = Uuid::new_v4();
    Identity::new(id, format!("{}@lovers.test", id.simple()))
  }

  pub fn admin(&self) -> Identity {
    let who = Identity::new(Uuid::new_v4(), "ops@mapofus.test");
    self.grants.grant(who.user_id, ADMIN_ROLE);
    who
  }

  /// Stores an order directly, bypassing generation.
  pub async fn seed_order(&self, owner: &Identity, status: OrderStatus, created_at: DateTime<Utc>) -> Order {
    let mut urls = BTreeMap::new();
    for variant in ImageVariant::ALL {
      urls.insert(variant, format!("https://storage.test/maps/{}/{}.jpg", owner.user_id, variant.as_str()));
    }
    let order = Order {
      id: Uuid::new_v4(),
      user_id: owner.user_id,
      story_text: story(150),
      story_metadata: StoryMetadata::default(),
      coupon_code: None,
      coupon_discount_percent: None,
      thumbnail_url: urls.get(&ImageVariant::Thumbnail).cloned(),
      hd_image_url: urls.get(&ImageVariant::Poster).cloned(),
      image_urls: urls,
      ai_prompt: "prompt".to_string(),
      image_provider: "openai".to_string(),
      order_status: status,
      payment_status: PaymentStatus::mirror_of(status),
      invoice_number: None,
      invoice_submitted_at: None,
      payment_verified_at: None,
      payment_verified_by: None,
      downloaded_at: None,
      admin_notes: None,
      created_at,
      updated_at: created_at,
    };
    self.orders.insert(&order).await.expect("seed insert")
  }

  pub async fn seed_old_order(&self, owner: &Identity, status: OrderStatus) -> Order {
    self.seed_order(owner, status, Utc::now() - ChronoDuration::hours(1)).await
  }

  pub fn put_coupon(&self, code: &str, max_uses: Option<i64>) {
    self.coupons.put(Coupon {
      code: code.to_string(),
      discount_percent: 20,
      max_uses,
      active: true,
      expires_at: None,
    });
  }
}

pub fn story(len: usize) -> String {
  "We met at a tiny bookshop in Lisbon and never stopped walking. "
    .chars()
    .cycle()
    .take(len)
    .collect()
}

pub fn request(story_len: usize) -> CreateOrderRequest {
  CreateOrderRequest {
    story_text: story(story_len),
    ..Default::default()
  }
}

/// Lets detached notification tasks run.
pub async fn settle() {
  for _ in 0..10 {
    tokio::task::yield_now().await;
  }
  tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}
