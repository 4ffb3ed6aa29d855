// mapofus-server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use mapofus::generation::GenerationPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  pub url: String,
  pub service_role_key: String,
  pub anon_key: String,
  pub storage_bucket: String,
}

#[derive(Debug, Clone)]
pub struct ProviderKeys {
  pub openai_api_key: Option<String>,
  pub openai_api_base: String,
  pub openai_model: String,
  pub replicate_api_token: Option<String>,
  pub replicate_api_base: String,
  pub replicate_model: String,
  pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
  pub resend_api_key: Option<String>,
  pub from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub app_base_url: String,

  pub database_url: String,
  pub database_max_connections: u32,
  pub run_migrations: bool,

  pub supabase: SupabaseConfig,
  pub providers: ProviderKeys,
  pub mail: MailConfig,

  pub policy: GenerationPolicy,

  /// Deprecated comma-separated admin allow-list, consulted only when the
  /// grant table is unreachable.
  pub admin_emails: Option<String>,
  pub log_format: LogFormat,
}

fn required(var_name: &str) -> Result<String> {
  env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
}

fn optional(var_name: &str) -> Option<String> {
  env::var(var_name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match optional(var_name) {
    Some(raw) => raw
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    None => Ok(default),
  }
}

impl LogFormat {
  pub fn from_env() -> Self {
    match optional("LOG_FORMAT").as_deref() {
      Some("json") => LogFormat::Json,
      _ => LogFormat::Text,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let server_host = optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parsed::<u16>("SERVER_PORT", 8080)?;
    let app_base_url = optional("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let database_url = required("DATABASE_URL")?;
    let database_max_connections = parsed::<u32>("DATABASE_MAX_CONNECTIONS", 10)?;
    let run_migrations = parsed::<bool>("RUN_MIGRATIONS", false)?;

    let supabase = SupabaseConfig {
      url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
      service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
      anon_key: required("SUPABASE_ANON_KEY")?,
      storage_bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| "maps".to_string()),
    };

    let providers = ProviderKeys {
      openai_api_key: optional("OPENAI_API_KEY"),
      openai_api_base: optional("OPENAI_API_BASE").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
      openai_model: optional("OPENAI_IMAGE_MODEL").unwrap_or_else(|| "gpt-image-1".to_string()),
      replicate_api_token: optional("REPLICATE_API_TOKEN"),
      replicate_api_base: optional("REPLICATE_API_BASE").unwrap_or_else(|| "https://api.replicate.com/v1".to_string()),
      replicate_model: optional("REPLICATE_MODEL").unwrap_or_else(|| "black-forest-labs/flux-schnell".to_string()),
      timeout: Duration::from_secs(parsed::<u64>("PROVIDER_TIMEOUT_SECS", 120)?),
    };

    let mail = MailConfig {
      resend_api_key: optional("RESEND_API_KEY"),
      from: optional("MAIL_FROM"),
    };

    let defaults = GenerationPolicy::default();
    let policy = GenerationPolicy {
      free_limit: parsed::<u32>("FREE_ORDER_LIMIT", defaults.free_limit)?,
      cooldown: Duration::from_secs(parsed::<u64>("GENERATION_COOLDOWN_SECS", defaults.cooldown.as_secs())?),
    };

    let config = Self {
      server_host,
      server_port,
      app_base_url,
      database_url,
      database_max_connections,
      run_migrations,
      supabase,
      providers,
      mail,
      policy,
      admin_emails: optional("ADMIN_EMAILS"),
      log_format: LogFormat::from_env(),
    };

    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      openai = config.providers.openai_api_key.is_some(),
      replicate = config.providers.replicate_api_token.is_some(),
      "Application configuration loaded successfully."
    );
    Ok(config)
  }
}
