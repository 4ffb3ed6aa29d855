// mapofus/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the step-pipeline engine itself, as opposed to the
/// handlers it runs.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}

/// The domain error taxonomy. Every fallible operation in the crate returns
/// this type; the HTTP layer maps it onto status codes via [`MapError::status_code`]
/// and [`MapError::code`].
#[derive(Debug, Error)]
pub enum MapError {
  #[error("{message}")]
  Validation { message: String, field: Option<String> },

  #[error("{0}")]
  Authentication(String),

  #[error("{0}")]
  Authorization(String),

  #[error("{0} not found")]
  NotFound(String),

  #[error("{0}")]
  PaymentRequired(String),

  #[error("Unpaid order limit of {limit} reached")]
  QuotaExceeded { limit: u32 },

  #[error("Rate limit exceeded")]
  RateLimit { retry_after_secs: Option<u64> },

  #[error("Provider '{provider}' failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
  Provider {
    provider: String,
    status: Option<u16>,
    message: String,
  },

  #[error("Persistence failure: {0}")]
  Persistence(String),

  #[error("Pipeline failure: {0}")]
  Flow(#[from] FlowError),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl MapError {
  pub fn validation(message: impl Into<String>) -> Self {
    MapError::Validation {
      message: message.into(),
      field: None,
    }
  }

  pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
    MapError::Validation {
      message: message.into(),
      field: Some(field.to_string()),
    }
  }

  pub fn forbidden() -> Self {
    MapError::Authorization("Forbidden".to_string())
  }

  pub fn provider(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
    MapError::Provider {
      provider: provider.to_string(),
      status,
      message: message.into(),
    }
  }

  /// Stable machine-readable code for API bodies.
  pub fn code(&self) -> &'static str {
    match self {
      MapError::Validation { .. } => "VALIDATION_ERROR",
      MapError::Authentication(_) => "AUTHENTICATION_ERROR",
      MapError::Authorization(_) => "AUTHORIZATION_ERROR",
      MapError::NotFound(_) => "NOT_FOUND",
      MapError::PaymentRequired(_) => "PAYMENT_REQUIRED",
      MapError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
      MapError::RateLimit { .. } => "RATE_LIMIT_ERROR",
      MapError::Provider { .. } => "PROVIDER_ERROR",
      MapError::Persistence(_) => "PERSISTENCE_ERROR",
      MapError::Flow(_) | MapError::Internal(_) => "INTERNAL_ERROR",
    }
  }

  pub fn status_code(&self) -> u16 {
    match self {
      MapError::Validation { .. } => 400,
      MapError::Authentication(_) => 401,
      MapError::PaymentRequired(_) => 402,
      MapError::Authorization(_) | MapError::QuotaExceeded { .. } => 403,
      MapError::NotFound(_) => 404,
      MapError::RateLimit { .. } => 429,
      MapError::Provider { .. } | MapError::Persistence(_) | MapError::Flow(_) | MapError::Internal(_) => 500,
    }
  }

  /// Whether the message is safe to show to the caller verbatim.
  pub fn is_client_facing(&self) -> bool {
    self.status_code() < 500
  }
}

impl From<AnyhowError> for MapError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<MapError>() {
      Ok(map_err) => map_err,
      Err(other) => MapError::Internal(format!("{other:#}")),
    }
  }
}

pub type MapResult<T, E = MapError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_and_statuses_follow_taxonomy() {
    assert_eq!(MapError::validation("x").status_code(), 400);
    assert_eq!(MapError::Authentication("x".into()).code(), "AUTHENTICATION_ERROR");
    assert_eq!(MapError::forbidden().status_code(), 403);
    assert_eq!(MapError::QuotaExceeded { limit: 3 }.status_code(), 403);
    assert_eq!(MapError::RateLimit { retry_after_secs: Some(4) }.status_code(), 429);
    assert_eq!(MapError::provider("openai", Some(502), "bad gateway").status_code(), 500);
    assert!(!MapError::Persistence("db down".into()).is_client_facing());
  }

  #[test]
  fn provider_message_includes_upstream_status() {
    let err = MapError::provider("replicate", Some(422), "invalid input");
    assert_eq!(err.to_string(), "Provider 'replicate' failed (422): invalid input");
    let err = MapError::provider("replicate", None, "no output");
    assert_eq!(err.to_string(), "Provider 'replicate' failed: no output");
  }

  #[test]
  fn anyhow_wrapping_a_map_error_is_unwrapped() {
    let wrapped = anyhow::Error::new(MapError::NotFound("Map".into()));
    let back: MapError = wrapped.into();
    assert!(matches!(back, MapError::NotFound(ref what) if what == "Map"));
  }
}
