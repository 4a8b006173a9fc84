//! HTTP Basic authentication against the configured accounts.
//!
//! Requests without credentials pass through as anonymous viewers. Requests
//! with credentials either resolve to an [`Actor`] (inserted into the request
//! extensions for the API's extractors) or are rejected with 401.

use std::{collections::HashMap, sync::Arc};

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::{OsRng, RngCore as _};
use serde::Deserialize;
use uwazi_core::user::{Actor, Role, User};

use crate::error::Error;

/// A login accepted by this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  /// Stable user id recorded on submissions. Defaults to `username`.
  #[serde(default)]
  pub user_id:       Option<String>,
  #[serde(default)]
  pub name:          String,
  #[serde(default)]
  pub email:         String,
  #[serde(default)]
  pub role:          Role,
  #[serde(default)]
  pub county:        Option<String>,
}

impl AccountConfig {
  pub fn user(&self) -> User {
    User {
      id:           self.user_id.clone().unwrap_or_else(|| self.username.clone()),
      name:         self.name.clone(),
      email:        self.email.clone(),
      role:         self.role,
      phone:        None,
      county:       self.county.clone(),
      constituency: None,
      ward:         None,
    }
  }
}

/// Hash `password` into an argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}

/// The configured accounts, indexed by username.
#[derive(Debug, Clone)]
pub struct Accounts {
  by_username: HashMap<String, AccountConfig>,
  /// Verified against on unknown usernames so a miss costs as much as a
  /// wrong password.
  decoy_hash:  String,
}

impl Accounts {
  /// Index `accounts` by username. A username listed twice is rejected.
  pub fn new(accounts: impl IntoIterator<Item = AccountConfig>) -> Result<Self, Error> {
    let mut by_username = HashMap::new();
    for account in accounts {
      if by_username.contains_key(&account.username) {
        return Err(Error::DuplicateAccount(account.username));
      }
      by_username.insert(account.username.clone(), account);
    }

    let mut decoy = [0u8; 24];
    OsRng.fill_bytes(&mut decoy);
    let decoy_hash = hash_password(&B64.encode(decoy))?;

    Ok(Self {
      by_username,
      decoy_hash,
    })
  }

  pub fn len(&self) -> usize { self.by_username.len() }

  pub fn is_empty(&self) -> bool { self.by_username.is_empty() }

  /// Resolve the caller from the `Authorization` header.
  ///
  /// `Ok(None)` when no header is present; `Err` when one is present but
  /// does not verify.
  pub fn verify(&self, headers: &HeaderMap) -> Result<Option<Actor>, Error> {
    let Some(header_val) = headers.get(axum::http::header::AUTHORIZATION) else {
      return Ok(None);
    };
    let header_val = header_val.to_str().map_err(|_| Error::Unauthorized)?;

    let encoded = header_val
      .strip_prefix("Basic ")
      .ok_or(Error::Unauthorized)?;

    let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
    let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

    let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

    let account = self.by_username.get(username);
    let stored = account.map_or(self.decoy_hash.as_str(), |a| a.password_hash.as_str());
    let parsed_hash = PasswordHash::new(stored).map_err(|_| Error::Unauthorized)?;

    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| Error::Unauthorized)?;

    // The decoy never verifies.
    let account = account.ok_or(Error::Unauthorized)?;
    Ok(Some(account.user().actor()))
  }
}

/// Middleware: attach the verified [`Actor`], if any, to the request.
pub async fn authenticate(
  State(accounts): State<Arc<Accounts>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  match accounts.verify(req.headers()) {
    Ok(Some(actor)) => {
      tracing::debug!(user = %actor.user_id, role = %actor.role, "authenticated");
      req.extensions_mut().insert(actor);
    }
    Ok(None) => {}
    Err(e) => {
      tracing::warn!(uri = %req.uri(), "rejected credentials");
      return Err(e);
    }
  }
  Ok(next.run(req).await)
}
