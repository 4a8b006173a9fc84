//! HTTP front end for Uwazi.
//!
//! Mounts the JSON API from `uwazi-api` under `/api`, authenticates callers
//! with HTTP Basic credentials from the configuration, and logs every issue
//! event the store emits.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tower_http::trace::TraceLayer;
use uwazi_classify::GeminiConfig;
use uwazi_core::{classify::Classifier, store::IssueStore};
use uwazi_store_sqlite::SqliteStore;

use auth::{AccountConfig, Accounts};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `UWAZI_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// SQLite file; `:memory:` for a throwaway store.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub accounts:   Vec<AccountConfig>,
  #[serde(default)]
  pub classifier: GeminiConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("uwazi.db") }

/// Where the issue database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
  Memory,
  File(PathBuf),
}

impl StoreLocation {
  pub async fn open(&self) -> uwazi_store_sqlite::Result<SqliteStore> {
    match self {
      Self::Memory => SqliteStore::open_in_memory().await,
      Self::File(path) => SqliteStore::open(path).await,
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional on disk) under `UWAZI_*` environment variables,
  /// e.g. `UWAZI_PORT=9000` or `UWAZI_CLASSIFIER__API_KEY=...`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("UWAZI")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// `:memory:` selects a throwaway store; a leading `~/` is resolved
  /// against `$HOME`.
  pub fn store_location(&self) -> StoreLocation {
    let raw = self.store_path.to_string_lossy();
    if raw == ":memory:" {
      return StoreLocation::Memory;
    }
    if let Some(rest) = raw.strip_prefix("~/")
      && let Some(home) = std::env::var_os("HOME")
    {
      return StoreLocation::File(PathBuf::from(home).join(rest));
    }
    StoreLocation::File(self.store_path.clone())
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router needs, shared across requests.
pub struct AppState<S, C> {
  pub store:      Arc<S>,
  pub classifier: Arc<C>,
  pub accounts:   Arc<Accounts>,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      classifier: Arc::clone(&self.classifier),
      accounts:   Arc::clone(&self.accounts),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: IssueStore + 'static,
  C: Classifier + 'static,
{
  Router::new()
    .nest("/api", uwazi_api::api_router(state.store, state.classifier))
    .route("/health", get(|| async { "ok" }))
    .layer(middleware::from_fn_with_state(state.accounts, auth::authenticate))
    .layer(TraceLayer::new_for_http())
}

// ─── Event log ────────────────────────────────────────────────────────────────

/// Log every event `store` emits until the store is dropped.
pub fn spawn_event_log<S: IssueStore>(store: &S) -> JoinHandle<()> {
  let mut events = store.subscribe();
  tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(event) => {
          tracing::info!(issue_id = %event.issue_id(), ?event, "issue event");
        }
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "event log fell behind");
        }
        Err(RecvError::Closed) => break,
      }
    }
  })
}
