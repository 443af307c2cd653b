//! The Consultation Engine.
//!
//! A request moves through
//! `Received → Validated → PlatformResolved → Authorized → CodeLocated →
//! Responded`, and may exit early at any stage with a [`Denial`]. Denials are
//! ordinary values; only backend failures come back as [`Error`].
//!
//! The engine is request-scoped and read-only: it borrows a store, holds no
//! state between calls, and never writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail as _;

use crate::{
  Error, Result,
  code::{InboundCode, Origin, origin_filter_for},
  normalize_email,
  platform::Platform,
  session::{SessionContext, is_master_key_used},
  store::GacStore,
  time_ago::{minutes_ago, time_ago_text},
};

// ─── Request / result types ──────────────────────────────────────────────────

/// What the public form submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRequest {
  pub platform_slug: String,
  pub email:         String,
  /// The access code, or the master username.
  pub username:      String,
}

/// Progress of a single consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Received,
  Validated,
  PlatformResolved,
  Authorized,
  CodeLocated,
  Responded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
  InvalidEmail,
  EmptyUsername,
}

/// Why a consultation ended without a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
  ValidationFailed(ValidationError),
  PlatformNotFound,
  PlatformDisabled,
  /// Deliberately says nothing about which of email, platform or code was
  /// wrong.
  Unauthorized,
  NoCodeFound,
}

impl Denial {
  /// Stable machine-readable reason.
  pub fn reason(&self) -> &'static str {
    match self {
      Self::ValidationFailed(_) => "validation_failed",
      Self::PlatformNotFound => "platform_not_found",
      Self::PlatformDisabled => "platform_disabled",
      Self::Unauthorized => "unauthorized",
      Self::NoCodeFound => "no_code_found",
    }
  }

  /// User-facing message.
  pub fn message(&self) -> &'static str {
    match self {
      Self::ValidationFailed(ValidationError::InvalidEmail) => {
        "El email ingresado no es válido"
      }
      Self::ValidationFailed(ValidationError::EmptyUsername) => {
        "El usuario no puede estar vacío"
      }
      Self::PlatformNotFound => "Plataforma no encontrada",
      Self::PlatformDisabled => "Esta plataforma no está disponible actualmente",
      Self::Unauthorized => {
        "No tienes acceso registrado para este correo y plataforma"
      }
      Self::NoCodeFound => {
        "No hay correos para esta plataforma todavía. Por favor intenta más tarde."
      }
    }
  }
}

/// A located email, ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultedCode {
  /// Platform display name.
  pub platform:        String,
  pub received_at:     DateTime<Utc>,
  pub minutes_ago:     i64,
  pub time_ago_text:   String,
  pub code:            Option<String>,
  pub email_from:      Option<String>,
  pub email_subject:   Option<String>,
  pub email_body:      Option<String>,
  pub is_master_view:  bool,
  /// Only set for master views, so the administrator can see whose mailbox
  /// was inspected.
  pub recipient_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationResult {
  Found(ConsultedCode),
  Denied(Denial),
}

impl ConsultationResult {
  pub fn is_success(&self) -> bool { matches!(self, Self::Found(_)) }
}

// ─── Validation ──────────────────────────────────────────────────────────────

struct Validated<'r> {
  /// Normalised email; the only key used for lookups and recipient checks.
  email:    String,
  /// Submitted verbatim; compared by exact equality.
  username: &'r str,
  slug:     String,
}

fn validate(request: &ConsultationRequest) -> Result<Validated<'_>, ValidationError> {
  let email = normalize_email(&request.email);
  if !email.validate_email() {
    return Err(ValidationError::InvalidEmail);
  }
  if request.username.trim().is_empty() {
    return Err(ValidationError::EmptyUsername);
  }
  Ok(Validated {
    email,
    username: &request.username,
    slug:     request.platform_slug.trim().to_lowercase(),
  })
}

/// Whether a row returned by the code store really belongs to this request.
fn row_matches(
  row: &InboundCode,
  platform_id: i64,
  email: &str,
  origin: Option<Origin>,
) -> bool {
  normalize_email(&row.recipient_email) == email
    && row.platform_id == platform_id
    && origin.is_none_or(|o| row.origin == o)
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Orchestrates a consultation against a backend implementing every
/// component trait.
pub struct ConsultationEngine<'a, S> {
  store: &'a S,
}

impl<'a, S: GacStore> ConsultationEngine<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Run a consultation as of the current time.
  pub async fn consult_code(
    &self,
    request: &ConsultationRequest,
    session: &SessionContext,
  ) -> Result<ConsultationResult> {
    self.consult_code_at(request, session, Utc::now()).await
  }

  /// Run a consultation, computing relative times against `now`.
  pub async fn consult_code_at(
    &self,
    request: &ConsultationRequest,
    session: &SessionContext,
    now: DateTime<Utc>,
  ) -> Result<ConsultationResult> {
    let mut stage = Stage::Received;

    let input = match validate(request) {
      Ok(v) => v,
      Err(e) => return Ok(deny(stage, Denial::ValidationFailed(e))),
    };
    advance(&mut stage, Stage::Validated);

    let platform = match self.resolve_platform(&input.slug).await? {
      Ok(p) => p,
      Err(d) => return Ok(deny(stage, d)),
    };
    advance(&mut stage, Stage::PlatformResolved);

    let is_master_view = self.master_key_used(session, input.username).await?;
    if !is_master_view {
      let granted = self
        .store
        .verify_access(&input.email, input.username, platform.id)
        .await
        .map_err(Error::backend)?;
      if !granted {
        return Ok(deny(stage, Denial::Unauthorized));
      }
    }
    advance(&mut stage, Stage::Authorized);

    let origin = origin_filter_for(&input.email);
    let row = self
      .store
      .find_latest_for_recipient(platform.id, &input.email, origin)
      .await
      .map_err(Error::backend)?;

    let row = match row {
      Some(r) if row_matches(&r, platform.id, &input.email, origin) => r,
      Some(r) => {
        tracing::warn!(
          code_id = r.id,
          platform_id = platform.id,
          requested = %input.email,
          returned = %r.recipient_email,
          "code store returned a row for another mailbox; discarding"
        );
        return Ok(deny(stage, Denial::NoCodeFound));
      }
      None => return Ok(deny(stage, Denial::NoCodeFound)),
    };
    advance(&mut stage, Stage::CodeLocated);

    let minutes = minutes_ago(row.received_at, now);
    let consulted = ConsultedCode {
      platform: platform.display_name,
      received_at: row.received_at,
      minutes_ago: minutes,
      time_ago_text: time_ago_text(minutes),
      code: row.code,
      email_from: row.email_from,
      email_subject: row.subject,
      email_body: row.email_body,
      is_master_view,
      recipient_email: is_master_view.then(|| row.recipient_email),
    };
    advance(&mut stage, Stage::Responded);

    tracing::info!(
      code_id = row.id,
      platform = %platform.slug,
      master = is_master_view,
      minutes_ago = minutes,
      "consultation served"
    );
    Ok(ConsultationResult::Found(consulted))
  }

  async fn resolve_platform(
    &self,
    slug: &str,
  ) -> Result<Result<Platform, Denial>> {
    let platform = self
      .store
      .find_by_slug(slug)
      .await
      .map_err(Error::backend)?;
    Ok(match platform {
      None => Err(Denial::PlatformNotFound),
      Some(p) if !p.enabled => Err(Denial::PlatformDisabled),
      Some(p) => Ok(p),
    })
  }

  /// Settings are only read for admin sessions; anonymous requests can never
  /// use the master key.
  async fn master_key_used(
    &self,
    session: &SessionContext,
    username: &str,
  ) -> Result<bool> {
    if !session.is_admin_authenticated {
      return Ok(false);
    }
    let settings = self.store.master_consult().await.map_err(Error::backend)?;
    Ok(is_master_key_used(session, &settings, username))
  }
}

fn advance(stage: &mut Stage, next: Stage) {
  tracing::debug!(from = ?stage, to = ?next, "consultation stage");
  *stage = next;
}

fn deny(stage: Stage, denial: Denial) -> ConsultationResult {
  tracing::debug!(at = ?stage, reason = denial.reason(), "consultation denied");
  ConsultationResult::Denied(denial)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
