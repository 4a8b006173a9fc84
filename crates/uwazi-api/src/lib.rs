//! JSON REST API for Uwazi.
//!
//! Exposes an axum [`Router`] backed by any [`uwazi_core::store::IssueStore`]
//! and [`uwazi_core::classify::Classifier`]. Authentication, TLS, and
//! transport concerns are the caller's responsibility: a caller that has
//! verified a user inserts an [`Actor`](uwazi_core::user::Actor) into the
//! request extensions before the request reaches this router.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", uwazi_api::api_router(store.clone(), classifier.clone()))
//! ```

pub mod analytics;
pub mod error;
pub mod extract;
pub mod issues;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRef,
  routing::{get, patch, post},
};
use uwazi_core::{classify::Classifier, store::IssueStore};

pub use error::ApiError;

/// Shared handler state.
pub struct ApiState<S, C> {
  pub store:      Arc<S>,
  pub classifier: Arc<C>,
}

impl<S, C> Clone for ApiState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      classifier: Arc::clone(&self.classifier),
    }
  }
}

impl<S, C> FromRef<ApiState<S, C>> for Arc<S> {
  fn from_ref(state: &ApiState<S, C>) -> Self { Arc::clone(&state.store) }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(store: Arc<S>, classifier: Arc<C>) -> Router<()>
where
  S: IssueStore + 'static,
  C: Classifier + 'static,
{
  Router::new()
    // Issues
    .route("/issues", get(issues::list::<S>).post(issues::create::<S, C>))
    .route("/issues/{id}", get(issues::get_one::<S>))
    .route("/issues/{id}/upvote", post(issues::upvote::<S>))
    .route("/issues/{id}/downvote", post(issues::downvote::<S>))
    .route("/issues/{id}/status", patch(issues::set_status::<S>))
    .route("/issues/{id}/response", post(issues::respond::<S>))
    .route("/issues/{id}/notes", post(issues::add_note::<S>))
    .route("/issues/{id}/updates", post(issues::add_update::<S>))
    .route("/me/issues", get(issues::mine::<S>))
    // Analytics
    .route("/analytics/summary", get(analytics::summary::<S>))
    .route("/analytics/counties", get(analytics::counties::<S>))
    .route("/analytics/categories", get(analytics::categories::<S>))
    .route("/analytics/trends", get(analytics::trends::<S>))
    .route("/analytics/recent", get(analytics::recent::<S>))
    .with_state(ApiState { store, classifier })
}
