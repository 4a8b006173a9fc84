//! The `uwazi` binary.
//!
//! `uwazi serve` (the default) opens the issue store named in the
//! configuration and serves the JSON API. `uwazi check-config` prints what a
//! configuration resolves to without binding anything, and
//! `uwazi hash-password` turns a password read from stdin into the argon2
//! PHC string expected in `[[accounts]].password_hash`.
//!
//! Logging is controlled by `UWAZI_LOG` (an `EnvFilter` directive).

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use uwazi_classify::GeminiClassifier;
use uwazi_server::{AppState, ServerConfig, StoreLocation, auth::Accounts};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Parser)]
#[command(author, version, about = "Uwazi civic issue server")]
struct Cli {
  /// TOML configuration file; missing is fine, `UWAZI_*` variables still apply.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API.
  Serve,
  /// Print the resolved configuration summary and exit.
  CheckConfig,
  /// Read a password from stdin and print its argon2 hash.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("UWAZI_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    )
    .init();

  let cli = Cli::parse();
  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      eprint!("Password: ");
      let password = std::io::stdin()
        .lines()
        .next()
        .context("no password on stdin")??;
      println!("{}", uwazi_server::auth::hash_password(&password)?);
      Ok(())
    }
    Command::CheckConfig => {
      let cfg = load(&cli.config)?;
      Accounts::new(cfg.accounts.clone())?;
      println!("listen:     {}:{}", cfg.host, cfg.port);
      println!("store:      {:?}", cfg.store_location());
      println!("accounts:   {}", cfg.accounts.len());
      println!(
        "classifier: {} ({})",
        cfg.classifier.model,
        if cfg.classifier.api_key.is_some() { "key set" } else { "keyword fallback" }
      );
      Ok(())
    }
    Command::Serve => serve(load(&cli.config)?).await,
  }
}

fn load(path: &std::path::Path) -> anyhow::Result<ServerConfig> {
  ServerConfig::load(path).with_context(|| format!("failed to load config from {path:?}"))
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let location = cfg.store_location();
  if location == StoreLocation::Memory {
    tracing::warn!("using an in-memory store; nothing will be persisted");
  }
  let store = location
    .open()
    .await
    .with_context(|| format!("failed to open store {location:?}"))?;

  if cfg.classifier.api_key.is_none() {
    tracing::warn!("no classifier api_key configured; submissions use keyword labels");
  }
  let classifier =
    GeminiClassifier::new(cfg.classifier.clone()).context("failed to build classifier client")?;

  let accounts = Accounts::new(cfg.accounts.clone())?;
  if accounts.is_empty() {
    tracing::warn!("no accounts configured; the API is read-only");
  } else {
    tracing::info!(accounts = accounts.len(), "loaded accounts");
  }

  let _event_log = uwazi_server::spawn_event_log(&store);

  let app = uwazi_server::router(AppState {
    store:      Arc::new(store),
    classifier: Arc::new(classifier),
    accounts:   Arc::new(accounts),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
      }
      tracing::info!("shutting down");
    })
    .await
    .context("server error")
}
