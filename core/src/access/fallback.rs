// mapofus/src/access/fallback.rs

//! Transitional admin allow-list keyed by email. Remove once every admin has a
//! grant row.

/// Lower-cased admin emails from configuration.
#[deprecated(note = "grant admin rights with the grant-admin tool instead")]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAllowlist {
  emails: Vec<String>,
}

#[allow(deprecated)]
impl EmailAllowlist {
  /// Parses a comma-separated list, ignoring blanks.
  pub fn parse(raw: &str) -> Self {
    let emails = raw
      .split(',')
      .map(|e| e.trim().to_lowercase())
      .filter(|e| !e.is_empty())
      .collect();
    Self { emails }
  }

  pub fn is_empty(&self) -> bool {
    self.emails.is_empty()
  }

  pub fn contains(&self, email: &str) -> bool {
    let email = email.trim().to_lowercase();
    self.emails.iter().any(|e| *e == email)
  }
}
