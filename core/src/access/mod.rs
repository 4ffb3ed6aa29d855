// mapofus/src/access/mod.rs

//! Capability checks: who is an admin, and who owns an order.

pub mod fallback;

use crate::error::{MapError, MapResult};
use crate::model::{Identity, Order, ADMIN_ROLE};
use crate::store::AdminGrantStore;
#[allow(deprecated)]
use fallback::EmailAllowlist;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
  pub is_admin: bool,
  pub role: Option<String>,
}

impl AdminStatus {
  fn denied() -> Self {
    Self {
      is_admin: false,
      role: None,
    }
  }
}

enum GrantLookup {
  Granted(String),
  Absent,
  Unavailable,
}

#[derive(Clone)]
#[allow(deprecated)]
pub struct AdminGate {
  grants: Arc<dyn AdminGrantStore>,
  fallback: Option<EmailAllowlist>,
}

impl AdminGate {
  pub fn new(grants: Arc<dyn AdminGrantStore>) -> Self {
    Self { grants, fallback: None }
  }

  /// Consulted only when the grant store cannot be reached.
  #[allow(deprecated)]
  pub fn with_email_fallback(mut self, fallback: EmailAllowlist) -> Self {
    self.fallback = (!fallback.is_empty()).then_some(fallback);
    self
  }

  async fn lookup(&self, identity: &Identity) -> GrantLookup {
    match self.grants.role_for(identity.user_id).await {
      // Any row in the grant table is an admin grant; the role is informational.
      Ok(Some(role)) => GrantLookup::Granted(role),
      Ok(_) => GrantLookup::Absent,
      Err(e) => {
        warn!(user_id = %identity.user_id, error = %e, "Admin grant lookup failed.");
        GrantLookup::Unavailable
      }
    }
  }

  /// Fail-closed: a missing grant and a failed lookup both mean "not admin".
  #[instrument(name = "AdminGate::is_admin", skip_all, fields(user_id = %identity.user_id))]
  pub async fn is_admin(&self, identity: &Identity) -> AdminStatus {
    match self.lookup(identity).await {
      GrantLookup::Granted(role) => AdminStatus {
        is_admin: true,
        role: Some(role),
      },
      GrantLookup::Absent | GrantLookup::Unavailable => AdminStatus::denied(),
    }
  }

  /// `is_admin`, failing with `Authorization` when negative.
  #[instrument(name = "AdminGate::require_admin", skip_all, fields(user_id = %identity.user_id), err(Display))]
  pub async fn require_admin(&self, identity: &Identity) -> MapResult<AdminStatus> {
    match self.lookup(identity).await {
      GrantLookup::Granted(role) => Ok(AdminStatus {
        is_admin: true,
        role: Some(role),
      }),
      GrantLookup::Absent => Err(MapError::forbidden()),
      GrantLookup::Unavailable => self.fallback_decision(identity),
    }
  }

  #[allow(deprecated)]
  fn fallback_decision(&self, identity: &Identity) -> MapResult<AdminStatus> {
    let allowed = self
      .fallback
      .as_ref()
      .zip(identity.email.as_deref())
      .is_some_and(|(list, email)| list.contains(email));
    if allowed {
      debug!("Admin access granted by email fallback list.");
      return Ok(AdminStatus {
        is_admin: true,
        role: Some(ADMIN_ROLE.to_string()),
      });
    }
    Err(MapError::forbidden())
  }
}

/// Owner-only paths: admins get no bypass here.
pub fn ensure_owner(order: &Order, identity: &Identity) -> MapResult<()> {
  if order.is_owned_by(identity.user_id) {
    Ok(())
  } else {
    Err(MapError::forbidden())
  }
}
