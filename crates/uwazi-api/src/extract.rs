//! Extractors: identity from request extensions, and the stock axum
//! extractors with rejections reported as [`ApiError`] JSON bodies.

use std::convert::Infallible;

use axum::{
  extract::{FromRequest, FromRequestParts},
  http::request::Parts,
};
use uwazi_core::user::Actor;

use crate::error::ApiError;

/// The authenticated caller. Rejects with 401 when the request carries no
/// [`Actor`] extension.
///
/// The API itself never authenticates; whatever mounts the router is
/// expected to insert an `Actor` for verified callers.
#[derive(Debug, Clone)]
pub struct RequireActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for RequireActor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Actor>()
      .cloned()
      .map(Self)
      .ok_or(ApiError::Unauthenticated)
  }
}

/// Whoever is looking, if anyone. Used to redact read responses.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Actor>);

impl Viewer {
  pub fn actor(&self) -> Option<&Actor> { self.0.as_ref() }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Self(parts.extensions.get::<Actor>().cloned()))
  }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
