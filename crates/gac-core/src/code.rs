//! Inbound codes: emails captured by the ingestion worker.
//!
//! Rows are written once by the worker and never mutated by the consultation
//! path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Origin ──────────────────────────────────────────────────────────────────

/// The ingestion channel an email was captured through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
  Imap,
  Gmail,
  Outlook,
}

impl Origin {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Imap => "imap",
      Self::Gmail => "gmail",
      Self::Outlook => "outlook",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "imap" => Ok(Self::Imap),
      "gmail" => Ok(Self::Gmail),
      "outlook" => Ok(Self::Outlook),
      other => Err(Error::UnknownOrigin(other.to_owned())),
    }
  }
}

const OUTLOOK_DOMAINS: [&str; 3] = ["@outlook.com", "@hotmail.com", "@live.com"];

/// The origin a requester's mailbox must have been read through, derived from
/// the email domain alone.
///
/// Gmail addresses only see Gmail-API rows, Microsoft consumer addresses only
/// see Outlook rows. Any other domain is unrestricted (`None`).
pub fn origin_filter_for(email: &str) -> Option<Origin> {
  let email = crate::normalize_email(email);
  if email.ends_with("@gmail.com") {
    Some(Origin::Gmail)
  } else if OUTLOOK_DOMAINS.iter().any(|d| email.ends_with(d)) {
    Some(Origin::Outlook)
  } else {
    None
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A stored inbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCode {
  pub id:              i64,
  pub platform_id:     i64,
  /// The mailbox the email was delivered to; lowercased and trimmed.
  pub recipient_email: String,
  /// The extracted code, when the worker managed to find one.
  pub code:            Option<String>,
  pub email_from:      Option<String>,
  pub subject:         Option<String>,
  /// Raw body; may be HTML.
  pub email_body:      Option<String>,
  pub received_at:     DateTime<Utc>,
  pub origin:          Origin,
}

/// Input for [`crate::store::CodeStore::record_code`].
#[derive(Debug, Clone)]
pub struct NewInboundCode {
  pub platform_id:     i64,
  pub recipient_email: String,
  pub code:            Option<String>,
  pub email_from:      Option<String>,
  pub subject:         Option<String>,
  pub email_body:      Option<String>,
  pub received_at:     DateTime<Utc>,
  pub origin:          Origin,
}

impl NewInboundCode {
  /// A minimal row; optional fields default to `None`.
  pub fn new(
    platform_id: i64,
    recipient_email: impl Into<String>,
    origin: Origin,
    received_at: DateTime<Utc>,
  ) -> Self {
    Self {
      platform_id,
      recipient_email: recipient_email.into(),
      code: None,
      email_from: None,
      subject: None,
      email_body: None,
      received_at,
      origin,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gmail_domain_filters_to_gmail() {
    assert_eq!(origin_filter_for("b@gmail.com"), Some(Origin::Gmail));
    assert_eq!(origin_filter_for("  B@GMAIL.COM "), Some(Origin::Gmail));
  }

  #[test]
  fn microsoft_domains_filter_to_outlook() {
    for email in ["c@outlook.com", "c@hotmail.com", "c@live.com"] {
      assert_eq!(origin_filter_for(email), Some(Origin::Outlook), "{email}");
    }
  }

  #[test]
  fn other_domains_are_unrestricted() {
    assert_eq!(origin_filter_for("a@pocoyoni.com"), None);
    // Suffix must be the whole domain.
    assert_eq!(origin_filter_for("a@notgmail.com.ar"), None);
    assert_eq!(origin_filter_for("a@mygmail.com"), None);
  }

  #[test]
  fn origin_parse_rejects_unknown() {
    assert_eq!(Origin::parse("gmail").unwrap(), Origin::Gmail);
    assert!(matches!(Origin::parse("pop3"), Err(Error::UnknownOrigin(_))));
  }
}
