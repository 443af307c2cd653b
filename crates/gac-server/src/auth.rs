//! Admin Basic-auth and the session middleware.
//!
//! A request without an `Authorization` header is anonymous. A request with
//! one must carry the configured admin credentials; anything else is a 401.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use gac_core::session::SessionContext;

use crate::error::Error;

/// Admin credentials accepted by this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Resolve the session for a request from its headers.
///
/// `Ok(None)` when no credentials were offered.
pub fn verify_auth(
  headers: &HeaderMap,
  config: &AuthConfig,
) -> Result<Option<SessionContext>, Error> {
  let Some(header_val) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let header_val = header_val.to_str().map_err(|_| Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Some(SessionContext::admin()))
}

/// Middleware: attach a [`SessionContext`] extension to every request.
pub async fn session_layer(
  State(auth): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let session = match verify_auth(req.headers(), &auth) {
    Ok(s) => s.unwrap_or_default(),
    Err(e) => {
      tracing::warn!(path = %req.uri().path(), "rejected admin credentials");
      return Err(e);
    }
  };
  if session.is_admin_authenticated {
    tracing::debug!("admin session");
  }
  req.extensions_mut().insert(session);
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn make_config(password: &str) -> AuthConfig {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".to_string(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials_give_admin() {
    let cfg = make_config("secret");
    let session = verify_auth(&headers(&basic("admin", "secret")), &cfg).unwrap();
    assert_eq!(session, Some(SessionContext::admin()));
  }

  #[test]
  fn missing_header_is_anonymous() {
    let cfg = make_config("secret");
    assert_eq!(verify_auth(&HeaderMap::new(), &cfg).unwrap(), None);
  }

  #[test]
  fn wrong_password() {
    let cfg = make_config("secret");
    let res = verify_auth(&headers(&basic("admin", "wrong")), &cfg);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn wrong_username() {
    let cfg = make_config("secret");
    let res = verify_auth(&headers(&basic("root", "secret")), &cfg);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let cfg = make_config("secret");
    let res = verify_auth(&headers("Basic !!!not-base64!!!"), &cfg);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }

  #[test]
  fn non_basic_scheme() {
    let cfg = make_config("secret");
    let res = verify_auth(&headers("Bearer abc"), &cfg);
    assert!(matches!(res, Err(Error::Unauthorized)));
  }
}
