//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Consultation denials are not errors; see [`crate::consult`]. This type
//! covers malformed requests and infrastructure failures only.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Body sent for any 5xx; internal detail stays in the server log.
pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("backend error: {0}")]
  Backend(#[from] gac_core::Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Backend(e) => {
        tracing::error!(error = %e, source = ?std::error::Error::source(e), "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_owned())
      }
    };
    (status, Json(json!({ "success": false, "message": message }))).into_response()
  }
}
