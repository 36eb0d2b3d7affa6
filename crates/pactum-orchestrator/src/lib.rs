//! The analysis orchestrator — drives each job through its phase machine.
//!
//! A submission persists a document and a `pending` job, then hands the job
//! to a background task. The task advances the job with atomic
//! compare-and-set phase transitions, so a job that was picked up elsewhere
//! (or already failed) is simply skipped. The three ways a run can end:
//!
//!   * the engine completes → normalize, consistency-check, persist a result
//!   * the engine pauses → persist its questions, park in
//!     `needs_clarification` until a human answers every one
//!   * anything fails → the job is failed with the error recorded, and never
//!     retried automatically
//!
//! Resolving the last open clarification triggers a resume through
//! [`AnalysisStore::try_begin_resume`], which guarantees exactly one resume
//! per pause no matter how many resolvers race.

mod error;

use std::{io::Write, sync::Arc};

use bytes::Bytes;
use pactum_core::{
  blob::BlobStore,
  clarification::{Clarification, NewClarification},
  document::{DocumentStatus, NewDocument},
  engine::{AnalysisEngine, ClarificationAnswer, EngineOutcome},
  error::ResolveError,
  job::JobPhase,
  normalize::normalize,
  result::{AnalysisPayload, NewResult},
  store::AnalysisStore,
};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use crate::error::SubmitError;
use crate::error::StepError;

/// A document handed in for analysis.
#[derive(Debug, Clone)]
pub struct SubmitDocument {
  pub owner:    String,
  pub filename: String,
  /// Caller-supplied metadata, stored verbatim on the document.
  pub metadata: serde_json::Value,
  pub bytes:    Bytes,
}

/// What a successful submission hands back: ids to poll with.
#[derive(Debug, Clone)]
pub struct Submission {
  pub document_id: Uuid,
  pub job_id:      Uuid,
  pub file_url:    String,
}

/// Coordinates the store, the engine, and the blob backend.
///
/// Cheap to clone; background tasks hold their own clone.
pub struct Orchestrator<S, E, B> {
  store:  Arc<S>,
  engine: Arc<E>,
  blobs:  Arc<B>,
}

impl<S, E, B> Clone for Orchestrator<S, E, B> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      engine: Arc::clone(&self.engine),
      blobs:  Arc::clone(&self.blobs),
    }
  }
}

impl<S, E, B> Orchestrator<S, E, B>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  pub fn new(store: Arc<S>, engine: Arc<E>, blobs: Arc<B>) -> Self {
    Self { store, engine, blobs }
  }

  /// The store, for read paths that don't go through the orchestrator.
  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Submission ────────────────────────────────────────────────────────

  /// Persist the document and its job, then start processing in the
  /// background. Returns as soon as the job exists; callers poll the job
  /// for progress.
  pub async fn submit(
    &self,
    input: SubmitDocument,
  ) -> Result<Submission, SubmitError> {
    // Keyed under a fresh id so re-submitting the same filename never
    // overwrites an earlier upload.
    let key = format!("{}/{}/{}", input.owner, Uuid::new_v4(), input.filename);
    let file_url = self
      .blobs
      .upload(&key, input.bytes)
      .await
      .map_err(|e| SubmitError::Blob(Box::new(e)))?;

    let document = self
      .store
      .create_document(NewDocument {
        owner:    input.owner.clone(),
        metadata: input.metadata,
        file_url: file_url.clone(),
      })
      .await
      .map_err(|e| SubmitError::Store(Box::new(e)))?;
    let job = self
      .store
      .create_job(document.document_id, &input.owner)
      .await
      .map_err(|e| SubmitError::Store(Box::new(e)))?;

    info!(
      job_id = %job.job_id,
      document_id = %document.document_id,
      owner = %input.owner,
      "job submitted"
    );

    let this = self.clone();
    let (job_id, document_id) = (job.job_id, document.document_id);
    tokio::spawn(async move {
      if let Err(err) = this.run_initial(job_id, document_id).await {
        this.mark_failed(job_id, document_id, &err.to_string()).await;
      }
    });

    Ok(Submission {
      document_id: document.document_id,
      job_id: job.job_id,
      file_url,
    })
  }

  // ── Initial run ───────────────────────────────────────────────────────

  async fn run_initial(
    &self,
    job_id: Uuid,
    document_id: Uuid,
  ) -> Result<(), StepError> {
    if !self
      .store
      .advance_job(job_id, &[JobPhase::Pending], JobPhase::Extracting)
      .await
      .map_err(StepError::store)?
    {
      debug!(%job_id, "job already claimed; skipping");
      return Ok(());
    }

    let document = self
      .store
      .get_document(document_id)
      .await
      .map_err(StepError::store)?
      .ok_or(StepError::MissingDocument(document_id))?;
    let bytes = self
      .blobs
      .download(&document.file_url)
      .await
      .map_err(StepError::blob)?;

    // Staged on local disk for the engine; removed on drop, so the file
    // never outlives the run on any exit path.
    let mut staged = NamedTempFile::new()?;
    staged.write_all(&bytes)?;
    staged.flush()?;

    if !self
      .store
      .advance_job(job_id, &[JobPhase::Extracting], JobPhase::Analyzing)
      .await
      .map_err(StepError::store)?
    {
      debug!(%job_id, "job left extracting underneath us; skipping");
      return Ok(());
    }

    let outcome = self.engine.invoke(staged.path()).await;
    self.apply_outcome(job_id, document_id, outcome).await
  }

  // ── Outcome handling ──────────────────────────────────────────────────

  async fn apply_outcome(
    &self,
    job_id: Uuid,
    document_id: Uuid,
    outcome: EngineOutcome,
  ) -> Result<(), StepError> {
    match outcome {
      EngineOutcome::Failed { message } => Err(StepError::Engine(message)),

      EngineOutcome::NeedsClarification { run_ref, questions } => {
        if questions.is_empty() {
          return Err(StepError::Engine(
            "engine paused without any questions".into(),
          ));
        }
        self
          .store
          .set_engine_run_ref(job_id, &run_ref)
          .await
          .map_err(StepError::store)?;
        let count = questions.len();
        for question in questions {
          self
            .store
            .create_clarification(NewClarification::from_engine(
              job_id,
              document_id,
              question,
            ))
            .await
            .map_err(StepError::store)?;
        }
        info!(%job_id, count, "engine paused with questions");
        self.pause(job_id, document_id).await
      }

      EngineOutcome::Completed { run_ref, output } => {
        if let Some(run_ref) = run_ref {
          self
            .store
            .set_engine_run_ref(job_id, &run_ref)
            .await
            .map_err(StepError::store)?;
        }
        let payload = normalize(output)?;
        self.finish(job_id, document_id, payload).await
      }
    }
  }

  async fn pause(
    &self,
    job_id: Uuid,
    document_id: Uuid,
  ) -> Result<(), StepError> {
    if !self
      .store
      .advance_job(
        job_id,
        &[JobPhase::Analyzing],
        JobPhase::NeedsClarification,
      )
      .await
      .map_err(StepError::store)?
    {
      warn!(%job_id, "job left analyzing before it could pause");
      return Ok(());
    }
    self
      .store
      .set_document_status(document_id, DocumentStatus::NeedsClarification)
      .await
      .map_err(StepError::store)?;
    Ok(())
  }

  /// A normalized payload is in hand. If every obligation's party is a known
  /// contract party, persist the result and complete; otherwise park the
  /// payload as a draft and raise one consistency question per offending
  /// obligation.
  async fn finish(
    &self,
    job_id: Uuid,
    document_id: Uuid,
    payload: AnalysisPayload,
  ) -> Result<(), StepError> {
    let unknown = payload.unknown_obligation_parties();
    if !unknown.is_empty() {
      let draft = serde_json::to_value(&payload).map_err(StepError::Draft)?;
      self
        .store
        .set_draft_result(job_id, Some(draft))
        .await
        .map_err(StepError::store)?;
      for (index, party) in &unknown {
        self
          .store
          .create_clarification(NewClarification::consistency(
            job_id,
            document_id,
            *index,
            party,
            &payload.parties,
          ))
          .await
          .map_err(StepError::store)?;
      }
      warn!(
        %job_id,
        unknown = unknown.len(),
        "result references unknown parties; pausing for consistency answers"
      );
      return self.pause(job_id, document_id).await;
    }

    let job = self
      .store
      .get_job(job_id)
      .await
      .map_err(StepError::store)?
      .ok_or(StepError::MissingJob(job_id))?;
    self
      .store
      .insert_result(NewResult {
        document_id,
        job_id,
        owner: job.owner,
        payload,
      })
      .await
      .map_err(StepError::store)?;
    if !self
      .store
      .advance_job(job_id, &[JobPhase::Analyzing], JobPhase::Completed)
      .await
      .map_err(StepError::store)?
    {
      warn!(%job_id, "job left analyzing before completion");
      return Ok(());
    }
    self
      .store
      .set_document_status(document_id, DocumentStatus::Completed)
      .await
      .map_err(StepError::store)?;
    info!(%job_id, "analysis completed");
    Ok(())
  }

  // ── Clarification resolution ──────────────────────────────────────────

  /// Resolve one clarification. If that was the last open question for the
  /// job, exactly one caller (of any number racing) triggers the resume.
  pub async fn resolve_clarification(
    &self,
    id: Uuid,
    response: &str,
  ) -> Result<Clarification, ResolveError<S::Error>> {
    let clarification = self.store.resolve_clarification(id, response).await?;
    let (job_id, document_id) =
      (clarification.job_id, clarification.document_id);

    if self
      .store
      .try_begin_resume(job_id)
      .await
      .map_err(ResolveError::Store)?
    {
      info!(%job_id, "last clarification resolved; resuming");
      let this = self.clone();
      tokio::spawn(async move {
        if let Err(err) = this.run_resume(job_id, document_id).await {
          this.mark_failed(job_id, document_id, &err.to_string()).await;
        }
      });
    }

    Ok(clarification)
  }

  /// The job is back in `analyzing` with every clarification answered.
  ///
  /// Which kind of pause just ended is decided by the parked draft, not by
  /// the job's clarification history: a draft exists if and only if the
  /// pause was a consistency pause, and is repaired locally with no engine
  /// call. Only a draft-less (engine) pause re-enters the run — answers
  /// from an earlier, already-consumed pause must never trigger a second
  /// resume of the same run.
  async fn run_resume(
    &self,
    job_id: Uuid,
    document_id: Uuid,
  ) -> Result<(), StepError> {
    let job = self
      .store
      .get_job(job_id)
      .await
      .map_err(StepError::store)?
      .ok_or(StepError::MissingJob(job_id))?;
    let clarifications = self
      .store
      .list_clarifications(job_id)
      .await
      .map_err(StepError::store)?;

    if let Some(draft) = job.draft_result {
      let mut payload: AnalysisPayload =
        serde_json::from_value(draft).map_err(StepError::Draft)?;
      for c in clarifications.iter().filter(|c| !c.is_open()) {
        let (Some(index), Some(response)) =
          (c.obligation_index, c.response.as_deref())
        else {
          continue;
        };
        if let Some(obligation) = payload.obligations.get_mut(index) {
          obligation.party = response.to_owned();
        }
        // The human answer is authoritative: an answer naming a party the
        // engine missed extends the party list rather than re-flagging.
        if !payload.parties.iter().any(|p| p == response) {
          payload.parties.push(response.to_owned());
        }
      }
      self
        .store
        .set_draft_result(job_id, None)
        .await
        .map_err(StepError::store)?;
      return self.finish(job_id, document_id, payload).await;
    }

    let answers: Vec<ClarificationAnswer> = clarifications
      .iter()
      .filter(|c| !c.is_open())
      .filter_map(|c| {
        Some(ClarificationAnswer {
          engine_ref: c.engine_ref.clone()?,
          response:   c.response.clone()?,
        })
      })
      .collect();
    let run_ref = job.engine_run_ref.ok_or(StepError::NoRunRef)?;
    let outcome = self.engine.resume(&run_ref, &answers).await;
    self.apply_outcome(job_id, document_id, outcome).await
  }

  // ── Failure ───────────────────────────────────────────────────────────

  async fn mark_failed(&self, job_id: Uuid, document_id: Uuid, cause: &str) {
    error!(%job_id, cause, "analysis failed");
    if let Err(err) = self.store.fail_job(job_id, cause).await {
      error!(%job_id, %err, "failed to record job failure");
    }
    if let Err(err) = self
      .store
      .set_document_status(document_id, DocumentStatus::Failed)
      .await
    {
      error!(%document_id, %err, "failed to record document failure");
    }
  }
}
