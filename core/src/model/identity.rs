// mapofus/src/model/identity.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated caller, as resolved by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: Uuid,
  pub email: Option<String>,
}

impl Identity {
  pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
    Self {
      user_id,
      email: Some(email.into()),
    }
  }
}
