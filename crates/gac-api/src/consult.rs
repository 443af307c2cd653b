//! The public consultation endpoint, `POST /codes/consult`.
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | missing field | 400 | `{"success":false,"message":…}` |
//! | code found | 200 | [`ConsultResponse`] with `success: true` |
//! | any denial | 404 | `{"success":false,"reason":…,"message":…}` |
//! | backend failure | 500 | opaque message |
//!
//! Every denial maps to 404, including validation and authorization
//! failures; existing clients depend on it.

use std::sync::Arc;

use axum::{
  Extension, Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use gac_core::{
  consult::{ConsultationEngine, ConsultationRequest, ConsultationResult},
  session::SessionContext,
  store::GacStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const MISSING_FIELDS_MESSAGE: &str = "Por favor completa todos los campos";

#[derive(Debug, Deserialize)]
pub struct ConsultBody {
  #[serde(default)]
  pub platform: String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub username: String,
}

/// Wire shape of a consultation result.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsultResponse {
  pub success:         bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub platform:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub received_at:     Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub minutes_ago:     Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub time_ago_text:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code:            Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email_from:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email_subject:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email_body:      Option<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub is_master_view:  bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recipient_email: Option<String>,
}

impl From<ConsultationResult> for ConsultResponse {
  fn from(result: ConsultationResult) -> Self {
    match result {
      ConsultationResult::Found(c) => Self {
        success:         true,
        platform:        Some(c.platform),
        received_at:     Some(c.received_at),
        minutes_ago:     Some(c.minutes_ago),
        time_ago_text:   Some(c.time_ago_text),
        code:            c.code,
        email_from:      c.email_from,
        email_subject:   c.email_subject,
        email_body:      c.email_body,
        is_master_view:  c.is_master_view,
        recipient_email: c.recipient_email.filter(|_| c.is_master_view),
        ..Default::default()
      },
      ConsultationResult::Denied(d) => Self {
        success: false,
        reason:  Some(d.reason().to_owned()),
        message: Some(d.message().to_owned()),
        ..Default::default()
      },
    }
  }
}

impl IntoResponse for ConsultResponse {
  fn into_response(self) -> Response {
    let status = if self.success { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (status, Json(self)).into_response()
  }
}

/// `POST /codes/consult`, body `{"platform":…,"email":…,"username":…}`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  session: Option<Extension<SessionContext>>,
  Json(body): Json<ConsultBody>,
) -> Result<ConsultResponse, ApiError>
where
  S: GacStore,
{
  if [&body.platform, &body.email, &body.username]
    .iter()
    .any(|f| f.trim().is_empty())
  {
    return Err(ApiError::BadRequest(MISSING_FIELDS_MESSAGE.to_owned()));
  }

  let session = session.map(|Extension(s)| s).unwrap_or_default();
  let request = ConsultationRequest {
    platform_slug: body.platform,
    email:         body.email,
    username:      body.username,
  };

  let result = ConsultationEngine::new(store.as_ref())
    .consult_code(&request, &session)
    .await?;
  Ok(result.into())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    Router,
    body::Body,
    http::{Request, header},
  };
  use chrono::Duration;
  use gac_core::{
    access::{AccessEntry, OAuthProvider},
    code::{InboundCode, NewInboundCode, Origin},
    platform::Platform,
    session::MasterConsultSettings,
    store::{AccessRegistry, CodeStore, PlatformDirectory, SettingsSource},
  };
  use gac_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;
  use crate::{api_router, error::INTERNAL_ERROR_MESSAGE};

  async fn seeded() -> Arc<SqliteStore> {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let netflix = s.add_platform("netflix", "Netflix", true).await.unwrap();
    s.add_platform("max", "Max", false).await.unwrap();
    s.upsert_access("a@pocoyoni.com", "user1", netflix.id).await.unwrap();
    let mut row = NewInboundCode::new(
      netflix.id,
      "a@pocoyoni.com",
      Origin::Imap,
      Utc::now() - Duration::minutes(3),
    );
    row.code = Some("5521".into());
    row.subject = Some("Tu código".into());
    s.record_code(row).await.unwrap();
    s.set_master_consult(&MasterConsultSettings { enabled: true, username: "masteradmin".into() })
      .await
      .unwrap();
    Arc::new(s)
  }

  async fn post(
    app: Router,
    body: serde_json::Value,
  ) -> (StatusCode, serde_json::Value) {
    let req = Request::builder()
      .method("POST")
      .uri("/codes/consult")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn body(platform: &str, email: &str, username: &str) -> serde_json::Value {
    serde_json::json!({ "platform": platform, "email": email, "username": username })
  }

  #[tokio::test]
  async fn found_code_returns_200() {
    let app = api_router(seeded().await);
    let (status, json) = post(app, body("netflix", "a@pocoyoni.com", "user1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["platform"], "Netflix");
    assert_eq!(json["minutes_ago"], 3);
    assert_eq!(json["code"], "5521");
    assert_eq!(json["email_subject"], "Tu código");
    assert!(json.get("is_master_view").is_none());
    assert!(json.get("recipient_email").is_none());
  }

  #[tokio::test]
  async fn every_denial_is_404_with_reason() {
    let store = seeded().await;
    let cases = [
      (body("netflix", "nope", "user1"), "validation_failed"),
      (body("hbo", "a@pocoyoni.com", "user1"), "platform_not_found"),
      (body("max", "a@pocoyoni.com", "user1"), "platform_disabled"),
      (body("netflix", "a@pocoyoni.com", "wrongcode"), "unauthorized"),
    ];
    for (payload, reason) in cases {
      let (status, json) = post(api_router(store.clone()), payload).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{reason}");
      assert_eq!(json["success"], false);
      assert_eq!(json["reason"], reason);
      assert!(json["message"].is_string());
    }
  }

  #[tokio::test]
  async fn missing_field_is_400() {
    let app = api_router(seeded().await);
    let (status, json) =
      post(app, serde_json::json!({ "platform": "netflix", "email": "a@pocoyoni.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], MISSING_FIELDS_MESSAGE);
  }

  #[tokio::test]
  async fn master_key_without_session_is_unauthorized() {
    let app = api_router(seeded().await);
    let (status, json) = post(app, body("netflix", "a@pocoyoni.com", "masteradmin")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["reason"], "unauthorized");
  }

  #[tokio::test]
  async fn master_key_with_admin_session_is_master_view() {
    let app = api_router(seeded().await).layer(Extension(SessionContext::admin()));
    let (status, json) = post(app, body("netflix", "a@pocoyoni.com", "masteradmin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_master_view"], true);
    assert_eq!(json["recipient_email"], "a@pocoyoni.com");
  }

  #[tokio::test]
  async fn platforms_lists_enabled_only() {
    let app = api_router(seeded().await);
    let req = Request::builder().uri("/platforms").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json, serde_json::json!([{ "slug": "netflix", "display_name": "Netflix" }]));
  }

  // ── Failing backend ───────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("connection refused: dsn=sqlite://admin:hunter2@db/gac")]
  struct Down;

  struct Broken;

  impl PlatformDirectory for Broken {
    type Error = Down;

    async fn find_by_slug(&self, _: &str) -> Result<Option<Platform>, Down> { Err(Down) }

    async fn list_enabled(&self) -> Result<Vec<Platform>, Down> { Err(Down) }
  }

  impl AccessRegistry for Broken {
    type Error = Down;

    async fn find_access(&self, _: &str, _: i64) -> Result<Option<AccessEntry>, Down> {
      Err(Down)
    }

    async fn upsert_access(&self, _: &str, _: &str, _: i64) -> Result<AccessEntry, Down> {
      Err(Down)
    }

    async fn attach_oauth_placeholder(
      &self,
      _: &str,
      _: OAuthProvider,
      _: i64,
    ) -> Result<bool, Down> {
      Err(Down)
    }

    async fn delete_access(&self, _: i64) -> Result<bool, Down> { Err(Down) }
  }

  impl CodeStore for Broken {
    type Error = Down;

    async fn find_latest_for_recipient(
      &self,
      _: i64,
      _: &str,
      _: Option<Origin>,
    ) -> Result<Option<InboundCode>, Down> {
      Err(Down)
    }

    async fn record_code(&self, _: NewInboundCode) -> Result<InboundCode, Down> { Err(Down) }
  }

  impl SettingsSource for Broken {
    type Error = Down;

    async fn master_consult(&self) -> Result<MasterConsultSettings, Down> { Err(Down) }
  }

  #[tokio::test]
  async fn backend_failure_is_opaque_500() {
    let app = api_router(Arc::new(Broken));
    let (status, json) = post(app, body("netflix", "a@pocoyoni.com", "user1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, serde_json::json!({ "success": false, "message": INTERNAL_ERROR_MESSAGE }));
    assert!(!json.to_string().contains("hunter2"));
  }

  #[tokio::test]
  async fn platform_listing_failure_is_opaque_500() {
    let app = api_router(Arc::new(Broken));
    let req = Request::builder().uri("/platforms").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("hunter2"), "{text}");
    assert!(text.contains(INTERNAL_ERROR_MESSAGE));
  }
}
