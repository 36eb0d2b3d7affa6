//! Error types shared across store backends.

use thiserror::Error;
use uuid::Uuid;

/// Outcome of [`crate::store::AnalysisStore::resolve_clarification`].
///
/// `NotFound` and `AlreadyResolved` are distinct, non-fatal outcomes: a caller
/// must be able to tell "my answer was recorded" apart from "someone already
/// answered this". `Store` wraps a backend failure.
#[derive(Debug, Error)]
pub enum ResolveError<E> {
  #[error("clarification not found: {0}")]
  NotFound(Uuid),

  #[error("clarification {0} is already resolved")]
  AlreadyResolved(Uuid),

  #[error("store error: {0}")]
  Store(#[source] E),
}
