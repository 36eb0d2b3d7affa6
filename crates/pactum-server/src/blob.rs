//! Filesystem [`BlobStore`] — uploaded documents live under a configured
//! root, addressed by `blob://` URLs relative to it.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use pactum_core::blob::BlobStore;
use thiserror::Error;

const URL_SCHEME: &str = "blob://";

#[derive(Debug, Error)]
pub enum BlobError {
  #[error("blob io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid blob key {0:?}")]
  InvalidKey(String),

  #[error("invalid blob url {0:?}")]
  InvalidUrl(String),
}

pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Keys must stay inside the root: relative, no `..` components.
  fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
    let relative = Path::new(key);
    let clean = relative
      .components()
      .all(|c| matches!(c, Component::Normal(_)));
    if key.is_empty() || !clean {
      return Err(BlobError::InvalidKey(key.to_owned()));
    }
    Ok(self.root.join(relative))
  }
}

impl BlobStore for FsBlobStore {
  type Error = BlobError;

  async fn upload(&self, key: &str, bytes: Bytes) -> Result<String, BlobError> {
    let path = self.resolve(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;
    Ok(format!("{URL_SCHEME}{key}"))
  }

  async fn download(&self, url: &str) -> Result<Bytes, BlobError> {
    let key = url
      .strip_prefix(URL_SCHEME)
      .ok_or_else(|| BlobError::InvalidUrl(url.to_owned()))?;
    let path = self.resolve(key)?;
    Ok(Bytes::from(tokio::fs::read(&path).await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn upload_then_download_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());

    let url = blobs
      .upload("user-1/abc/msa.pdf", Bytes::from_static(b"%PDF"))
      .await
      .unwrap();
    assert_eq!(url, "blob://user-1/abc/msa.pdf");
    assert_eq!(blobs.download(&url).await.unwrap(), "%PDF");
  }

  #[tokio::test]
  async fn traversal_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());

    let err = blobs
      .upload("../escape.pdf", Bytes::from_static(b"x"))
      .await
      .unwrap_err();
    assert!(matches!(err, BlobError::InvalidKey(_)));

    let err = blobs.download("blob:///etc/passwd").await.unwrap_err();
    assert!(matches!(err, BlobError::InvalidKey(_)));
  }

  #[tokio::test]
  async fn missing_blob_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());
    let err = blobs.download("blob://user-1/nope.pdf").await.unwrap_err();
    assert!(matches!(err, BlobError::Io(_)));
  }
}
