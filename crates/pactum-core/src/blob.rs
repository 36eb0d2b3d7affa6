//! The [`BlobStore`] trait — upload/download of source documents by opaque
//! URL. Implemented by storage backends (e.g. the local filesystem store in
//! `pactum-server`); keys are owner-scoped by convention.

use std::future::Future;

use bytes::Bytes;

/// Abstraction over a blob storage backend.
pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `bytes` under `key` and return the opaque URL the blob can later
  /// be downloaded from.
  fn upload<'a>(
    &'a self,
    key: &'a str,
    bytes: Bytes,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Fetch the blob previously stored at `url`.
  fn download<'a>(
    &'a self,
    url: &'a str,
  ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send + 'a;
}
