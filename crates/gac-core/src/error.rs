//! Error types for `gac-core`.
//!
//! Expected consultation failures (bad input, unknown platform, no access,
//! no email yet) are not errors; they are [`crate::consult::Denial`] values.
//! Only infrastructure failures travel through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown origin: {0:?}")]
  UnknownOrigin(String),

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a storage backend error.
  pub fn backend<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
