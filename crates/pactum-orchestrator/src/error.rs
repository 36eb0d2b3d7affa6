use thiserror::Error;
use uuid::Uuid;

/// Synchronous-path errors returned to the caller of
/// [`Orchestrator::submit`](crate::Orchestrator::submit).
///
/// Backend error types are erased here so API layers can stay generic over
/// the store and blob implementations.
#[derive(Debug, Error)]
pub enum SubmitError {
  #[error("failed to store document: {0}")]
  Blob(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("persistence failed: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors inside a background processing step. Never surfaced to a caller
/// directly; the step runner records `to_string()` on the failed job.
#[derive(Debug, Error)]
pub(crate) enum StepError {
  #[error("{0}")]
  Engine(String),

  #[error("{0}")]
  Normalize(#[from] pactum_core::normalize::NormalizeError),

  #[error("persistence failed: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to fetch document bytes: {0}")]
  Blob(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to stage document for analysis: {0}")]
  Io(#[from] std::io::Error),

  #[error("{0}")]
  Draft(#[source] serde_json::Error),

  #[error("document {0} disappeared mid-run")]
  MissingDocument(Uuid),

  #[error("job {0} disappeared mid-run")]
  MissingJob(Uuid),

  #[error("job has no engine run to resume")]
  NoRunRef,
}

impl StepError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub(crate) fn blob<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Blob(Box::new(err))
  }
}
