//! `GET /platforms`: the enabled platforms offered by the consultation form.

use std::sync::Arc;

use axum::{Json, extract::State};
use gac_core::store::{GacStore, PlatformDirectory};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct PlatformSummary {
  pub slug:         String,
  pub display_name: String,
}

/// `GET /platforms`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<PlatformSummary>>, ApiError>
where
  S: GacStore,
{
  let platforms = store
    .list_enabled()
    .await
    .map_err(|e| ApiError::Backend(gac_core::Error::backend(e)))?;

  Ok(Json(
    platforms
      .into_iter()
      .map(|p| PlatformSummary { slug: p.slug, display_name: p.display_name })
      .collect(),
  ))
}
