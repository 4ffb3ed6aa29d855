// mapofus/src/generation/policy.rs
use std::time::Duration;

/// Limits enforced before any image is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
  /// Unpaid orders a user may hold at once.
  pub free_limit: u32,
  /// Minimum gap between two orders of the same user.
  pub cooldown: Duration,
}

impl Default for GenerationPolicy {
  fn default() -> Self {
    Self {
      free_limit: 3,
      cooldown: Duration::from_secs(30),
    }
  }
}
