//! pactum-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`, overridable via
//! `PACTUM_*` environment variables), opens an in-process SQLite store and a
//! filesystem blob root, and serves the analysis API over HTTP.

mod blob;
mod config;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::{Json, Router, extract::DefaultBodyLimit, routing::get};
use clap::Parser;
use pactum_engine::HttpEngine;
use pactum_orchestrator::Orchestrator;
use pactum_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{blob::FsBlobStore, config::ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Pactum contract-analysis server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = ::config::Config::builder()
    .add_source(::config::File::from(cli.config).required(false))
    .add_source(::config::Environment::with_prefix("PACTUM"))
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let blobs = FsBlobStore::new(expand_tilde(&server_cfg.blob_root));
  let engine = HttpEngine::new(
    &server_cfg.engine_url,
    Duration::from_secs(server_cfg.engine_timeout_secs),
  );

  let orchestrator =
    Orchestrator::new(Arc::new(store), Arc::new(engine), Arc::new(blobs));

  let app = Router::new()
    .route(
      "/health",
      get(|| async { Json(serde_json::json!({ "status": "ok" })) }),
    )
    .nest("/api", pactum_api::api_router(orchestrator))
    .layer(DefaultBodyLimit::max(server_cfg.max_upload_bytes))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
