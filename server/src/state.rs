// mapofus-server/src/state.rs

use crate::config::AppConfig;
use crate::db::{PgAdminGrants, PgCoupons, PgOrderStore, PgSettings};
use crate::errors::{AppError, Result};
use crate::services::{ResendMailer, SupabaseSessions, SupabaseStorage};
#[allow(deprecated)]
use mapofus::access::fallback::EmailAllowlist;
use mapofus::generation::{GenerationDeps, GenerationPolicy};
use mapofus::imaging::DerivationSpec;
use mapofus::model::DEFAULT_IMAGE_PROVIDER;
use mapofus::providers::{OpenAiConfig, OpenAiProvider, ReplicateConfig, ReplicateProvider};
use mapofus::store::{Backends, SessionProvider};
use mapofus::{AdminGate, AdminService, GenerationService, ImageProviderRegistry, Notifier, OrderService};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
  pub generation: GenerationService,
  pub orders: OrderService,
  pub admin: AdminService,
  pub sessions: Arc<dyn SessionProvider>,
}

/// Knobs that differ between production wiring and tests.
#[derive(Debug, Clone)]
pub struct StateOptions {
  pub policy: GenerationPolicy,
  pub derivation: DerivationSpec,
  pub app_base_url: String,
  pub admin_emails: Option<String>,
}

impl Default for StateOptions {
  fn default() -> Self {
    Self {
      policy: GenerationPolicy::default(),
      derivation: DerivationSpec::default(),
      app_base_url: "http://127.0.0.1:8080".to_string(),
      admin_emails: None,
    }
  }
}

impl AppState {
  pub fn new(
    backends: Backends,
    providers: ImageProviderRegistry,
    sessions: Arc<dyn SessionProvider>,
    options: StateOptions,
  ) -> Self {
    let gate = admin_gate(&backends, options.admin_emails.as_deref());
    let notifier = Notifier::new(backends.mailer.clone(), options.app_base_url);
    let generation = GenerationService::new(GenerationDeps {
      backends: backends.clone(),
      providers: providers.clone(),
      policy: options.policy,
      derivation: options.derivation,
      notifier,
    });
    Self {
      generation,
      orders: OrderService::new(backends.clone()),
      admin: AdminService::new(backends, gate, providers),
      sessions,
    }
  }

  /// Production wiring: Postgres stores plus the Supabase and Resend clients.
  pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| AppError::Config(format!("HTTP client: {e}")))?;

    let backends = Backends {
      orders: Arc::new(PgOrderStore::new(pool.clone())),
      grants: Arc::new(PgAdminGrants::new(pool.clone())),
      coupons: Arc::new(PgCoupons::new(pool.clone())),
      settings: Arc::new(PgSettings::new(pool)),
      blobs: Arc::new(SupabaseStorage::new(http.clone(), &config.supabase)),
      mailer: Arc::new(ResendMailer::new(http.clone(), &config.mail)),
    };
    let providers = build_providers(config)?;
    let sessions = Arc::new(SupabaseSessions::new(http, &config.supabase));

    Ok(Self::new(
      backends,
      providers,
      sessions,
      StateOptions {
        policy: config.policy,
        derivation: DerivationSpec::default(),
        app_base_url: config.app_base_url.clone(),
        admin_emails: config.admin_emails.clone(),
      },
    ))
  }
}

#[allow(deprecated)]
fn admin_gate(backends: &Backends, admin_emails: Option<&str>) -> AdminGate {
  let gate = AdminGate::new(backends.grants.clone());
  match admin_emails {
    Some(raw) => gate.with_email_fallback(EmailAllowlist::parse(raw)),
    None => gate,
  }
}

fn build_providers(config: &AppConfig) -> Result<ImageProviderRegistry> {
  let keys = &config.providers;
  let default = if keys.openai_api_key.is_some() || keys.replicate_api_token.is_none() {
    DEFAULT_IMAGE_PROVIDER
  } else {
    mapofus::providers::replicate::PROVIDER_NAME
  };
  let mut registry = ImageProviderRegistry::new(default);

  if let Some(api_key) = &keys.openai_api_key {
    let mut openai = OpenAiConfig::new(api_key.clone());
    openai.api_base = keys.openai_api_base.clone();
    openai.model = keys.openai_model.clone();
    openai.timeout = keys.timeout;
    registry.register(Arc::new(OpenAiProvider::new(openai)?));
  }
  if let Some(api_token) = &keys.replicate_api_token {
    let mut replicate = ReplicateConfig::new(api_token.clone());
    replicate.api_base = keys.replicate_api_base.clone();
    replicate.model = keys.replicate_model.clone();
    replicate.timeout = keys.timeout;
    registry.register(Arc::new(ReplicateProvider::new(replicate)?));
  }

  if registry.names().is_empty() {
    warn!("No image provider configured; map generation will fail.");
  } else {
    info!(providers = ?registry.names(), default = registry.default_name(), "Image providers registered.");
  }
  Ok(registry)
}
