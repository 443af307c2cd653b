//! [`SqliteStore`], the SQLite implementation of the GAC component traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use gac_core::{
  access::{AccessCredential, AccessEntry, OAuthProvider},
  code::{InboundCode, NewInboundCode, Origin},
  normalize_email,
  platform::Platform,
  session::MasterConsultSettings,
  store::{AccessRegistry, CodeStore, PlatformDirectory, SettingsSource},
};

use crate::{
  Error, Result,
  encode::{RawAccessEntry, RawInboundCode, RawPlatform, encode_dt},
  schema::{MASTER_CONSULT_ENABLED, MASTER_CONSULT_USERNAME, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A GAC store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn platform_exists(&self, platform_id: i64) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM platforms WHERE id = ?1",
              rusqlite::params![platform_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  // ── Platforms ─────────────────────────────────────────────────────────────

  /// Register a platform. The slug is stored lowercased.
  pub async fn add_platform(
    &self,
    slug: &str,
    display_name: &str,
    enabled: bool,
  ) -> Result<Platform> {
    let slug = slug.trim().to_lowercase();
    let display_name = display_name.to_owned();

    let raw: RawPlatform = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO platforms (slug, display_name, enabled) VALUES (?1, ?2, ?3)",
          rusqlite::params![slug, display_name, enabled],
        )?;
        Ok(RawPlatform {
          id: conn.last_insert_rowid(),
          slug,
          display_name,
          enabled,
        })
      })
      .await?;

    Ok(raw.into_platform())
  }

  /// Enable or disable a platform. Returns `false` if the id is unknown.
  pub async fn set_platform_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE platforms SET enabled = ?2 WHERE id = ?1",
          rusqlite::params![id, enabled],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM settings WHERE key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  /// Insert or overwrite a setting.
  pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_owned();
    let value = value.to_owned();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             value      = excluded.value,
             updated_at = excluded.updated_at",
          rusqlite::params![key, value, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Persist both master-consult settings.
  pub async fn set_master_consult(&self, settings: &MasterConsultSettings) -> Result<()> {
    let flag = if settings.enabled { "1" } else { "0" };
    self.set_setting(MASTER_CONSULT_ENABLED, flag).await?;
    self
      .set_setting(MASTER_CONSULT_USERNAME, &settings.username)
      .await
  }
}

// ─── PlatformDirectory impl ──────────────────────────────────────────────────

impl PlatformDirectory for SqliteStore {
  type Error = Error;

  async fn find_by_slug(&self, slug: &str) -> Result<Option<Platform>> {
    let slug = slug.to_owned();

    let raw: Option<RawPlatform> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM platforms WHERE slug = ?1", RawPlatform::COLUMNS),
              rusqlite::params![slug],
              RawPlatform::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawPlatform::into_platform))
  }

  async fn list_enabled(&self) -> Result<Vec<Platform>> {
    let raws: Vec<RawPlatform> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM platforms WHERE enabled = 1 ORDER BY display_name ASC",
          RawPlatform::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawPlatform::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawPlatform::into_platform).collect())
  }
}

// ─── AccessRegistry impl ─────────────────────────────────────────────────────

impl AccessRegistry for SqliteStore {
  type Error = Error;

  async fn find_access(&self, email: &str, platform_id: i64) -> Result<Option<AccessEntry>> {
    let email = normalize_email(email);

    let raw: Option<RawAccessEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM access_entries
                 WHERE email = ?1 AND platform_id = ?2 AND enabled = 1",
                RawAccessEntry::COLUMNS
              ),
              rusqlite::params![email, platform_id],
              RawAccessEntry::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccessEntry::into_entry).transpose()
  }

  async fn upsert_access(
    &self,
    email: &str,
    access_code: &str,
    platform_id: i64,
  ) -> Result<AccessEntry> {
    if !self.platform_exists(platform_id).await? {
      return Err(Error::PlatformNotFound(platform_id));
    }

    let email = normalize_email(email);
    let code = access_code.to_owned();
    let at_str = encode_dt(Utc::now());

    let raw: RawAccessEntry = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO access_entries
             (email, access_code, platform_id, enabled, created_at, updated_at)
           VALUES (?1, ?2, ?3, 1, ?4, ?4)
           ON CONFLICT(email, platform_id) DO UPDATE SET
             access_code = excluded.access_code,
             enabled     = 1,
             updated_at  = excluded.updated_at",
          rusqlite::params![email, code, platform_id, at_str],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {} FROM access_entries WHERE email = ?1 AND platform_id = ?2",
            RawAccessEntry::COLUMNS
          ),
          rusqlite::params![email, platform_id],
          RawAccessEntry::from_row,
        )?)
      })
      .await?;

    raw.into_entry()
  }

  async fn attach_oauth_placeholder(
    &self,
    email: &str,
    provider: OAuthProvider,
    platform_id: i64,
  ) -> Result<bool> {
    if !self.platform_exists(platform_id).await? {
      return Err(Error::PlatformNotFound(platform_id));
    }

    let email = normalize_email(email);
    let sentinel = AccessCredential::OAuthPlaceholder(provider)
      .as_stored()
      .to_owned();
    let at_str = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO access_entries
             (email, access_code, platform_id, enabled, created_at, updated_at)
           VALUES (?1, ?2, ?3, 1, ?4, ?4)
           ON CONFLICT(email, platform_id) DO NOTHING",
          rusqlite::params![email, sentinel, platform_id, at_str],
        )?)
      })
      .await?;

    Ok(inserted > 0)
  }

  async fn delete_access(&self, id: i64) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM access_entries WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

// ─── CodeStore impl ──────────────────────────────────────────────────────────

impl CodeStore for SqliteStore {
  type Error = Error;

  async fn find_latest_for_recipient(
    &self,
    platform_id: i64,
    recipient_email: &str,
    origin: Option<Origin>,
  ) -> Result<Option<InboundCode>> {
    let recipient = normalize_email(recipient_email);
    let origin_str = origin.map(|o| o.as_str().to_owned());

    let raw: Option<RawInboundCode> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM codes
                 WHERE platform_id = ?1
                   AND recipient_email = ?2
                   AND (?3 IS NULL OR origin = ?3)
                 ORDER BY received_at DESC, id DESC
                 LIMIT 1",
                RawInboundCode::COLUMNS
              ),
              rusqlite::params![platform_id, recipient, origin_str],
              RawInboundCode::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInboundCode::into_code).transpose()
  }

  async fn record_code(&self, input: NewInboundCode) -> Result<InboundCode> {
    if !self.platform_exists(input.platform_id).await? {
      return Err(Error::PlatformNotFound(input.platform_id));
    }

    let row = InboundCode {
      id:              0,
      platform_id:     input.platform_id,
      recipient_email: normalize_email(&input.recipient_email),
      code:            input.code,
      email_from:      input.email_from,
      subject:         input.subject,
      email_body:      input.email_body,
      received_at:     input.received_at,
      origin:          input.origin,
    };

    let platform_id = row.platform_id;
    let recipient   = row.recipient_email.clone();
    let code        = row.code.clone();
    let email_from  = row.email_from.clone();
    let subject     = row.subject.clone();
    let email_body  = row.email_body.clone();
    let at_str      = encode_dt(row.received_at);
    let origin_str  = row.origin.as_str();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO codes (
             platform_id, recipient_email, code, email_from, subject,
             email_body, received_at, origin
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            platform_id,
            recipient,
            code,
            email_from,
            subject,
            email_body,
            at_str,
            origin_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(InboundCode { id, ..row })
  }
}

// ─── SettingsSource impl ─────────────────────────────────────────────────────

impl SettingsSource for SqliteStore {
  type Error = Error;

  async fn master_consult(&self) -> Result<MasterConsultSettings> {
    let enabled = self.get_setting(MASTER_CONSULT_ENABLED).await?;
    let username = self.get_setting(MASTER_CONSULT_USERNAME).await?;
    Ok(MasterConsultSettings {
      enabled:  enabled.as_deref() == Some("1"),
      username: username.unwrap_or_default(),
    })
  }
}
