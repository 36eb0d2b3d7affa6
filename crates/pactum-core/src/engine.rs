//! The [`AnalysisEngine`] contract — the external reasoning pipeline as a
//! black box with three outcomes.
//!
//! Engine-side failures (transport errors, timeouts, unexpected run states)
//! are expressed as [`EngineOutcome::Failed`], never as panics and never
//! retried here; retry policy belongs to a caller-level supervisor.

use std::{future::Future, path::Path};

/// A question the engine raised mid-run.
#[derive(Debug, Clone)]
pub struct EngineClarification {
  /// The engine's identifier for this question, needed to submit the answer
  /// back into the same run.
  pub engine_ref: String,
  pub question:   String,
  /// Candidate answers; empty for an open-ended question.
  pub options:    Vec<String>,
  pub category:   Option<String>,
}

/// A human answer to an engine-raised question, keyed by the engine's id.
#[derive(Debug, Clone)]
pub struct ClarificationAnswer {
  pub engine_ref: String,
  pub response:   String,
}

/// The three ways an engine call can come back.
#[derive(Debug, Clone)]
pub enum EngineOutcome {
  /// The run finished. `output` is the engine's raw result and must still be
  /// normalized before persistence.
  Completed {
    run_ref: Option<String>,
    output:  serde_json::Value,
  },
  /// The run paused; it can be re-entered with answers via
  /// [`AnalysisEngine::resume`].
  NeedsClarification {
    run_ref:   String,
    questions: Vec<EngineClarification>,
  },
  /// Unrecoverable engine-side error (including timeouts and states that are
  /// neither paused nor complete).
  Failed { message: String },
}

/// Abstraction over the external analysis engine.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Implementations
/// must bound every call with a timeout; an elapsed timeout is a `Failed`
/// outcome.
pub trait AnalysisEngine: Send + Sync {
  /// Start a fresh run over the document at `document`.
  fn invoke<'a>(
    &'a self,
    document: &'a Path,
  ) -> impl Future<Output = EngineOutcome> + Send + 'a;

  /// Re-enter the run identified by `run_ref` with human answers. The engine
  /// may raise further clarifications after a resume; callers must treat that
  /// as a normal pause, not an error.
  fn resume<'a>(
    &'a self,
    run_ref: &'a str,
    answers: &'a [ClarificationAnswer],
  ) -> impl Future<Output = EngineOutcome> + Send + 'a;
}
