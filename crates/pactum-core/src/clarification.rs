//! Clarification — a paused, unanswered question raised mid-analysis.
//!
//! Clarifications are created only while a job pauses into
//! `needs_clarification`. Engine-raised questions carry the engine's own
//! clarification id so the answer can be submitted back into the same run;
//! consistency questions raised locally by the orchestrator carry the index
//! of the obligation they repair instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::EngineClarification;

/// How urgently a question needs a human answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
}

/// `Open → Resolved`; `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClarificationStatus {
  Open,
  Resolved,
}

/// An open or resolved question attached to a paused job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clarification {
  pub clarification_id: Uuid,
  pub job_id:           Uuid,
  pub document_id:      Uuid,
  pub question:         String,
  /// Ordered candidate answers; empty for an open-ended question.
  pub options:          Vec<String>,
  /// Free-form classification from the engine (or `"consistency"` for
  /// locally-raised questions).
  pub category:         Option<String>,
  pub priority:         Priority,
  /// The engine's identifier for this question; `None` for questions raised
  /// locally by the orchestrator.
  pub engine_ref:       Option<String>,
  /// For consistency questions: the obligation this answer repairs.
  pub obligation_index: Option<usize>,
  pub status:           ClarificationStatus,
  /// Set exactly once, at resolution. A resolved clarification always has a
  /// response.
  pub response:         Option<String>,
  pub created_at:       DateTime<Utc>,
  pub resolved_at:      Option<DateTime<Utc>>,
}

impl Clarification {
  pub fn is_open(&self) -> bool {
    self.status == ClarificationStatus::Open
  }
}

/// Input for creating a [`Clarification`]. Id, status, and timestamps are
/// store-assigned; new clarifications are always `Open`.
#[derive(Debug, Clone)]
pub struct NewClarification {
  pub job_id:           Uuid,
  pub document_id:      Uuid,
  pub question:         String,
  pub options:          Vec<String>,
  pub category:         Option<String>,
  pub priority:         Priority,
  pub engine_ref:       Option<String>,
  pub obligation_index: Option<usize>,
}

impl NewClarification {
  /// A question raised by the engine mid-run. Engine questions block the
  /// whole pipeline, so they are always high priority.
  pub fn from_engine(job_id: Uuid, document_id: Uuid, q: EngineClarification) -> Self {
    Self {
      job_id,
      document_id,
      question: q.question,
      options: q.options,
      category: q.category,
      priority: Priority::High,
      engine_ref: Some(q.engine_ref),
      obligation_index: None,
    }
  }

  /// A consistency question raised locally when a completed result references
  /// a party that is not in the `parties` set.
  pub fn consistency(
    job_id: Uuid,
    document_id: Uuid,
    obligation_index: usize,
    unknown_party: &str,
    known_parties: &[String],
  ) -> Self {
    Self {
      job_id,
      document_id,
      question: format!(
        "Obligation {n} is attributed to {unknown_party:?}, which is not a \
         listed contract party. Who does this obligation belong to?",
        n = obligation_index + 1,
      ),
      options: known_parties.to_vec(),
      category: Some("consistency".into()),
      priority: Priority::Medium,
      engine_ref: None,
      obligation_index: Some(obligation_index),
    }
  }
}
