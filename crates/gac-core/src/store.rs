//! Component traits for the consultation path.
//!
//! Each component the engine talks to is its own trait so a backend can be
//! swapped (or faked in tests) piecewise. `gac-store-sqlite` implements all
//! of them on one type.
//!
//! All methods return `Send` futures so the traits can be used from axum
//! handlers on a multi-threaded runtime.

use std::future::Future;

use crate::{
  access::{AccessEntry, OAuthProvider},
  code::{InboundCode, NewInboundCode, Origin},
  platform::Platform,
  session::MasterConsultSettings,
};

/// Everything the Consultation Engine needs from a backend.
pub trait GacStore:
  PlatformDirectory + AccessRegistry + CodeStore + SettingsSource
{
}

impl<T> GacStore for T where
  T: PlatformDirectory + AccessRegistry + CodeStore + SettingsSource
{
}

// ─── Platform Directory ──────────────────────────────────────────────────────

pub trait PlatformDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve a platform by slug, enabled or not. Returns `None` if unknown.
  fn find_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Platform>, Self::Error>> + Send + 'a;

  /// All enabled platforms, ordered by display name.
  fn list_enabled(
    &self,
  ) -> impl Future<Output = Result<Vec<Platform>, Self::Error>> + Send + '_;
}

// ─── Access Registry ─────────────────────────────────────────────────────────

/// The authorization source of truth: `(email, platform) → access code`.
///
/// Implementations normalise `email` (trim + lowercase) before any lookup or
/// write.
pub trait AccessRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The enabled entry for `(email, platform_id)`, if any.
  fn find_access<'a>(
    &'a self,
    email: &'a str,
    platform_id: i64,
  ) -> impl Future<Output = Result<Option<AccessEntry>, Self::Error>> + Send + 'a;

  /// Insert, or on `(email, platform_id)` conflict overwrite the code,
  /// re-enable the entry and bump `updated_at`. Replaces OAuth placeholders.
  fn upsert_access<'a>(
    &'a self,
    email: &'a str,
    access_code: &'a str,
    platform_id: i64,
  ) -> impl Future<Output = Result<AccessEntry, Self::Error>> + Send + 'a;

  /// Insert an OAuth placeholder unless an entry already exists. Returns
  /// `true` if a row was created.
  fn attach_oauth_placeholder<'a>(
    &'a self,
    email: &'a str,
    provider: OAuthProvider,
    platform_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete an entry by id. Returns `false` if it did not exist.
  fn delete_access(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// `true` iff an enabled entry exists for `(email, platform_id)` whose
  /// manually-set code equals `access_code` exactly.
  fn verify_access<'a>(
    &'a self,
    email: &'a str,
    access_code: &'a str,
    platform_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a {
    async move {
      let entry = self.find_access(email, platform_id).await?;
      Ok(entry.is_some_and(|e| e.grants(access_code)))
    }
  }
}

// ─── Code Store ──────────────────────────────────────────────────────────────

pub trait CodeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The most recent row for `platform_id` delivered exactly to
  /// `recipient_email`, restricted to `origin` when given. Ordered by
  /// `received_at` then insertion id, both descending.
  fn find_latest_for_recipient<'a>(
    &'a self,
    platform_id: i64,
    recipient_email: &'a str,
    origin: Option<Origin>,
  ) -> impl Future<Output = Result<Option<InboundCode>, Self::Error>> + Send + 'a;

  /// Persist a row on behalf of the ingestion worker.
  fn record_code(
    &self,
    input: NewInboundCode,
  ) -> impl Future<Output = Result<InboundCode, Self::Error>> + Send + '_;
}

// ─── Settings ────────────────────────────────────────────────────────────────

pub trait SettingsSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Current master-consult flag and username. Missing keys read as
  /// disabled / empty.
  fn master_consult(
    &self,
  ) -> impl Future<Output = Result<MasterConsultSettings, Self::Error>> + Send + '_;
}
