//! HTTP server for GAC.
//!
//! Wires the JSON API from `gac-api` to a SQLite store, resolves the admin
//! session from Basic auth, and traces every request.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use gac_core::{session::MasterConsultSettings, store::{GacStore, SettingsSource}};
use gac_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `GAC_*`
/// environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  pub store_path:              PathBuf,
  pub admin_username:          String,
  pub admin_password_hash:     String,
  /// When set, overrides the persisted master-consult flag at startup.
  #[serde(default)]
  pub master_consult_enabled:  Option<bool>,
  /// When set, overrides the persisted master username at startup.
  #[serde(default)]
  pub master_consult_username: Option<String>,
}

impl ServerConfig {
  /// Apply the configured master-consult overrides on top of `current`.
  /// Returns `None` when the config leaves both untouched.
  pub fn master_consult_overrides(
    &self,
    current: &MasterConsultSettings,
  ) -> Option<MasterConsultSettings> {
    if self.master_consult_enabled.is_none() && self.master_consult_username.is_none() {
      return None;
    }
    Some(MasterConsultSettings {
      enabled:  self.master_consult_enabled.unwrap_or(current.enabled),
      username: self
        .master_consult_username
        .clone()
        .unwrap_or_else(|| current.username.clone()),
    })
  }
}

/// Persist the config's master-consult overrides into the settings table.
pub async fn seed_master_consult(
  store: &SqliteStore,
  config: &ServerConfig,
) -> gac_store_sqlite::Result<()> {
  let current = store.master_consult().await?;
  if let Some(next) = config.master_consult_overrides(&current) {
    tracing::info!(enabled = next.enabled, "master consult settings updated from config");
    store.set_master_consult(&next).await?;
  }
  Ok(())
}

// ─── Application state ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/api/v1/*` behind the session layer.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: GacStore + 'static,
{
  Router::new()
    .nest("/api/v1", gac_api::api_router(state.store.clone()))
    .layer(middleware::from_fn_with_state(state.auth.clone(), auth::session_layer))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use chrono::{Duration, Utc};
  use gac_core::{
    code::{NewInboundCode, Origin},
    store::{AccessRegistry, CodeStore},
  };
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  fn config() -> ServerConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(b"secret", &salt)
      .unwrap()
      .to_string();
    ServerConfig {
      host:                    "127.0.0.1".to_string(),
      port:                    8080,
      store_path:              PathBuf::from(":memory:"),
      admin_username:          "admin".to_string(),
      admin_password_hash:     hash,
      master_consult_enabled:  Some(true),
      master_consult_username: Some("masteradmin".to_string()),
    }
  }

  async fn app() -> Router {
    let cfg = config();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let p = store.add_platform("disney", "Disney+", true).await.unwrap();
    store.upsert_access("b@pocoyoni.com", "clave", p.id).await.unwrap();
    let mut row =
      NewInboundCode::new(p.id, "b@pocoyoni.com", Origin::Imap, Utc::now() - Duration::minutes(90));
    row.code = Some("771204".into());
    store.record_code(row).await.unwrap();
    seed_master_consult(&store, &cfg).await.unwrap();

    router(AppState {
      store: Arc::new(store),
      auth:  Arc::new(AuthConfig {
        username:      cfg.admin_username.clone(),
        password_hash: cfg.admin_password_hash.clone(),
      }),
    })
  }

  fn consult(username: &str, authorization: Option<&str>) -> Request<Body> {
    let body = serde_json::json!({
      "platform": "disney",
      "email": "b@pocoyoni.com",
      "username": username,
    });
    let mut req = Request::builder()
      .method("POST")
      .uri("/api/v1/codes/consult")
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(a) = authorization {
      req = req.header(header::AUTHORIZATION, a);
    }
    req.body(Body::from(body.to_string())).unwrap()
  }

  async fn json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[tokio::test]
  async fn anonymous_consult_with_access_code() {
    let resp = app().await.oneshot(consult("clave", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["code"], "771204");
    assert_eq!(body["time_ago_text"], "hace 1 hora(s)");
  }

  #[tokio::test]
  async fn admin_master_key_gives_master_view() {
    let auth = basic("admin", "secret");
    let resp = app().await.oneshot(consult("masteradmin", Some(&auth))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["is_master_view"], true);
    assert_eq!(body["recipient_email"], "b@pocoyoni.com");
  }

  #[tokio::test]
  async fn master_key_without_auth_is_denied() {
    let resp = app().await.oneshot(consult("masteradmin", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(resp).await["reason"], "unauthorized");
  }

  #[tokio::test]
  async fn bad_credentials_are_401() {
    let auth = basic("admin", "nope");
    let resp = app().await.oneshot(consult("clave", Some(&auth))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn seeding_keeps_unset_fields() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .set_master_consult(&MasterConsultSettings { enabled: false, username: "jefe".into() })
      .await
      .unwrap();
    let cfg = ServerConfig { master_consult_username: None, ..config() };
    seed_master_consult(&store, &cfg).await.unwrap();
    let s = store.master_consult().await.unwrap();
    assert!(s.enabled);
    assert_eq!(s.username, "jefe");
  }

  #[tokio::test]
  async fn seeding_without_overrides_is_a_no_op() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = ServerConfig {
      master_consult_enabled: None,
      master_consult_username: None,
      ..config()
    };
    seed_master_consult(&store, &cfg).await.unwrap();
    assert_eq!(store.master_consult().await.unwrap(), MasterConsultSettings::default());
  }
}
