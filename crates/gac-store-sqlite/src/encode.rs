//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that `ORDER BY` on the text column is
//! chronological. Booleans are `0`/`1` integers.

use chrono::{DateTime, SecondsFormat, Utc};
use gac_core::{
  access::{AccessCredential, AccessEntry},
  code::{InboundCode, Origin},
  platform::Platform,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `platforms` row.
pub struct RawPlatform {
  pub id:           i64,
  pub slug:         String,
  pub display_name: String,
  pub enabled:      bool,
}

impl RawPlatform {
  pub const COLUMNS: &'static str = "id, slug, display_name, enabled";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      slug:         row.get(1)?,
      display_name: row.get(2)?,
      enabled:      row.get(3)?,
    })
  }

  pub fn into_platform(self) -> Platform {
    Platform {
      id:           self.id,
      slug:         self.slug,
      display_name: self.display_name,
      enabled:      self.enabled,
    }
  }
}

/// Raw values read from an `access_entries` row.
pub struct RawAccessEntry {
  pub id:          i64,
  pub email:       String,
  pub access_code: String,
  pub platform_id: i64,
  pub enabled:     bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAccessEntry {
  pub const COLUMNS: &'static str =
    "id, email, access_code, platform_id, enabled, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      email:       row.get(1)?,
      access_code: row.get(2)?,
      platform_id: row.get(3)?,
      enabled:     row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<AccessEntry> {
    Ok(AccessEntry {
      id:          self.id,
      email:       self.email,
      credential:  AccessCredential::from_stored(&self.access_code),
      platform_id: self.platform_id,
      enabled:     self.enabled,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from a `codes` row.
pub struct RawInboundCode {
  pub id:              i64,
  pub platform_id:     i64,
  pub recipient_email: String,
  pub code:            Option<String>,
  pub email_from:      Option<String>,
  pub subject:         Option<String>,
  pub email_body:      Option<String>,
  pub received_at:     String,
  pub origin:          String,
}

impl RawInboundCode {
  pub const COLUMNS: &'static str = "id, platform_id, recipient_email, code, \
                                     email_from, subject, email_body, \
                                     received_at, origin";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      platform_id:     row.get(1)?,
      recipient_email: row.get(2)?,
      code:            row.get(3)?,
      email_from:      row.get(4)?,
      subject:         row.get(5)?,
      email_body:      row.get(6)?,
      received_at:     row.get(7)?,
      origin:          row.get(8)?,
    })
  }

  pub fn into_code(self) -> Result<InboundCode> {
    Ok(InboundCode {
      id:              self.id,
      platform_id:     self.platform_id,
      recipient_email: self.recipient_email,
      code:            self.code,
      email_from:      self.email_from,
      subject:         self.subject,
      email_body:      self.email_body,
      received_at:     decode_dt(&self.received_at)?,
      origin:          Origin::parse(&self.origin)?,
    })
  }
}
