//! The `AnalysisStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `pactum-store-sqlite`).
//! Higher layers (`pactum-orchestrator`, `pactum-api`) depend on this
//! abstraction, not on any concrete backend.
//!
//! Job phase changes go through [`AnalysisStore::advance_job`], an atomic
//! compare-and-set guarded by the current phase — the single mechanism that
//! keeps concurrent processing units for the same job from double-running.

use std::future::Future;

use uuid::Uuid;

use crate::{
  clarification::{Clarification, NewClarification},
  document::{Document, DocumentStatus, NewDocument},
  error::ResolveError,
  job::{Job, JobPhase},
  result::{NewResult, StoredResult},
};

// ─── Query types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  /// Insertion-time ascending — the default, stable under concurrent inserts.
  #[default]
  Asc,
  Desc,
}

/// Parameters for [`AnalysisStore::list_results`].
#[derive(Debug, Clone)]
pub struct ResultQuery {
  pub owner:  String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
  pub order:  SortOrder,
}

impl ResultQuery {
  pub fn for_owner(owner: impl Into<String>) -> Self {
    Self {
      owner:  owner.into(),
      limit:  None,
      offset: None,
      order:  SortOrder::default(),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Pactum persistence backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AnalysisStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Persist a new document in `Processing` status.
  fn create_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Set a document's client-visible status, refreshing `updated_at`.
  fn set_document_status(
    &self,
    id: Uuid,
    status: DocumentStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Jobs ──────────────────────────────────────────────────────────────

  /// Create a job for `document_id` in the `Pending` phase.
  fn create_job<'a>(
    &'a self,
    document_id: Uuid,
    owner: &'a str,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + 'a;

  /// Retrieve a job by id. Returns `None` if not found.
  fn get_job(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  /// Atomically move a job to `to` if (and only if) its current phase is one
  /// of `from`. Returns whether the caller won the transition. `updated_at`
  /// is refreshed on success.
  fn advance_job<'a>(
    &'a self,
    id: Uuid,
    from: &'a [JobPhase],
    to: JobPhase,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Move a job to `Failed` with `error` recorded, unless it is already
  /// terminal (terminal jobs are immutable).
  fn fail_job<'a>(
    &'a self,
    id: Uuid,
    error: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Record the engine's run handle on the job for later resume.
  fn set_engine_run_ref<'a>(
    &'a self,
    id: Uuid,
    run_ref: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Park (or clear) a normalized payload awaiting consistency answers.
  fn set_draft_result(
    &self,
    id: Uuid,
    draft: Option<serde_json::Value>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Clarifications ────────────────────────────────────────────────────

  /// Persist a new open clarification.
  fn create_clarification(
    &self,
    input: NewClarification,
  ) -> impl Future<Output = Result<Clarification, Self::Error>> + Send + '_;

  /// Retrieve a clarification by id. Returns `None` if not found.
  fn get_clarification(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Clarification>, Self::Error>> + Send + '_;

  /// All clarifications for a job, open and resolved, oldest first.
  fn list_clarifications(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Clarification>, Self::Error>> + Send + '_;

  /// Resolve an open clarification with `response`, setting `resolved_at`.
  ///
  /// Fails with [`ResolveError::NotFound`] for an unknown id and
  /// [`ResolveError::AlreadyResolved`] if it was resolved before — an
  /// idempotent rejection, not a silent no-op.
  fn resolve_clarification<'a>(
    &'a self,
    id: Uuid,
    response: &'a str,
  ) -> impl Future<Output = Result<Clarification, ResolveError<Self::Error>>> + Send + 'a;

  /// Atomically check "zero open clarifications for this job, and the job is
  /// still `NeedsClarification`" and, if so, move the job to `Analyzing`.
  ///
  /// Exactly one of any number of concurrent callers wins; losers get
  /// `false`. This is the only linkage between clarification state and job
  /// state, and it is what makes the resume trigger race-safe.
  fn try_begin_resume(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Results ───────────────────────────────────────────────────────────

  /// Append a result row. Earlier rows for the same document are kept.
  fn insert_result(
    &self,
    input: NewResult,
  ) -> impl Future<Output = Result<StoredResult, Self::Error>> + Send + '_;

  /// The newest result for `document_id` owned by `owner`, if any.
  fn get_result<'a>(
    &'a self,
    document_id: Uuid,
    owner: &'a str,
  ) -> impl Future<Output = Result<Option<StoredResult>, Self::Error>> + Send + 'a;

  /// Results for an owner with skip/limit pagination over a fixed sort key
  /// (insertion time), stable under concurrent inserts.
  fn list_results<'a>(
    &'a self,
    query: &'a ResultQuery,
  ) -> impl Future<Output = Result<Vec<StoredResult>, Self::Error>> + Send + 'a;

  /// Flip `starred` on the newest result for the document. Returns the new
  /// value, or `None` if the owner has no result for the document.
  fn toggle_star<'a>(
    &'a self,
    document_id: Uuid,
    owner: &'a str,
  ) -> impl Future<Output = Result<Option<bool>, Self::Error>> + Send + 'a;

  /// Delete all results for the document. Returns whether anything was
  /// deleted. Jobs are never deleted (audit trail).
  fn delete_results<'a>(
    &'a self,
    document_id: Uuid,
    owner: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
