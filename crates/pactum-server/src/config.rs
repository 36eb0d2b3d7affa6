//! Runtime server configuration, deserialised from `config.toml` and the
//! `PACTUM_*` environment.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  /// SQLite database path.
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Root directory for uploaded documents.
  #[serde(default = "default_blob_root")]
  pub blob_root:           PathBuf,
  /// Base URL of the analysis engine service.
  #[serde(default = "default_engine_url")]
  pub engine_url:          String,
  /// Wall-clock bound for a single engine call, in seconds.
  #[serde(default = "default_engine_timeout")]
  pub engine_timeout_secs: u64,
  /// Largest accepted upload, in bytes.
  #[serde(default = "default_max_upload")]
  pub max_upload_bytes:    usize,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8200 }
fn default_store_path() -> PathBuf { "pactum.db".into() }
fn default_blob_root() -> PathBuf { "blobs".into() }
fn default_engine_url() -> String { "http://127.0.0.1:9300".into() }
fn default_engine_timeout() -> u64 {
  pactum_engine::DEFAULT_TIMEOUT.as_secs()
}
fn default_max_upload() -> usize { 10 * 1024 * 1024 }
