//! JSON API for GAC.
//!
//! Exposes an axum [`Router`] backed by any [`gac_core::store::GacStore`].
//! Authentication and transport are the caller's responsibility: the consult
//! handler reads a [`gac_core::session::SessionContext`] request extension if
//! one was inserted upstream, and treats the request as anonymous otherwise.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", gac_api::api_router(store.clone()))
//! ```

pub mod consult;
pub mod error;
pub mod platforms;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gac_core::store::GacStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: GacStore + 'static,
{
  Router::new()
    .route("/codes/consult", post(consult::handler::<S>))
    .route("/platforms", get(platforms::list::<S>))
    .with_state(store)
}
