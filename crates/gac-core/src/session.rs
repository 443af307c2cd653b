//! Session context and the master-key override.
//!
//! The session is built once at the HTTP boundary and handed to the engine as
//! a value; nothing in this crate reads ambient request state.

use serde::{Deserialize, Serialize};

/// Who is asking, as far as the consultation path cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
  pub is_admin_authenticated: bool,
}

impl SessionContext {
  pub fn anonymous() -> Self { Self { is_admin_authenticated: false } }

  pub fn admin() -> Self { Self { is_admin_authenticated: true } }
}

/// System settings backing the master-key override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterConsultSettings {
  pub enabled:  bool,
  /// The value an administrator types in the username field.
  pub username: String,
}

/// `true` only when the feature is on, a master username is configured, the
/// session is an authenticated administrator, and the submitted username is
/// exactly the configured one.
pub fn is_master_key_used(
  session: &SessionContext,
  settings: &MasterConsultSettings,
  submitted_username: &str,
) -> bool {
  settings.enabled
    && !settings.username.is_empty()
    && session.is_admin_authenticated
    && submitted_username == settings.username
}
