//! Platform: an external service whose access codes arrive by email.

use serde::{Deserialize, Serialize};

/// A platform row as seen by the consultation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
  pub id:           i64,
  /// Unique lowercase identifier, e.g. `netflix`.
  pub slug:         String,
  pub display_name: String,
  /// Disabled platforms reject every consultation.
  pub enabled:      bool,
}
