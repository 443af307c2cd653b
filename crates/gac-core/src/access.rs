//! Access entries: the authorization records of the Access Registry.
//!
//! An entry binds one `(email, platform)` pair to a shared access code. The
//! code is a plain credential string compared by exact equality; it is not a
//! password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── OAuth placeholders ──────────────────────────────────────────────────────

/// Mailbox provider whose OAuth connection can create a placeholder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
  Gmail,
  Outlook,
}

impl OAuthProvider {
  /// The sentinel string stored in place of a real access code.
  pub fn sentinel(self) -> &'static str {
    match self {
      Self::Gmail => "Gmail (OAuth)",
      Self::Outlook => "Outlook (OAuth)",
    }
  }

  pub fn from_sentinel(s: &str) -> Option<Self> {
    match s {
      "Gmail (OAuth)" => Some(Self::Gmail),
      "Outlook (OAuth)" => Some(Self::Outlook),
      _ => None,
    }
  }
}

// ─── Credential ──────────────────────────────────────────────────────────────

/// What an access entry holds in its access-code column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AccessCredential {
  /// A code set by an administrator.
  Manual(String),
  /// Created automatically when a mailbox was connected over OAuth and no
  /// code has been assigned yet. Never grants access.
  OAuthPlaceholder(OAuthProvider),
}

impl AccessCredential {
  /// Decode the stored column value.
  pub fn from_stored(s: &str) -> Self {
    match OAuthProvider::from_sentinel(s) {
      Some(p) => Self::OAuthPlaceholder(p),
      None => Self::Manual(s.to_owned()),
    }
  }

  /// Encode for storage.
  pub fn as_stored(&self) -> &str {
    match self {
      Self::Manual(code) => code,
      Self::OAuthPlaceholder(p) => p.sentinel(),
    }
  }

  pub fn is_placeholder(&self) -> bool {
    matches!(self, Self::OAuthPlaceholder(_))
  }

  /// Exact string comparison against a submitted code.
  pub fn matches(&self, submitted: &str) -> bool {
    match self {
      Self::Manual(code) => code == submitted,
      Self::OAuthPlaceholder(_) => false,
    }
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEntry {
  pub id:          i64,
  /// Lowercased and trimmed.
  pub email:       String,
  pub credential:  AccessCredential,
  pub platform_id: i64,
  pub enabled:     bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl AccessEntry {
  /// Whether this entry lets `submitted` through.
  pub fn grants(&self, submitted: &str) -> bool {
    self.enabled && self.credential.matches(submitted)
  }
}
