//! Job — one tracked attempt to analyze a document.
//!
//! A job only ever moves forward through the transition graph below. The
//! orchestrator is the sole writer; jobs are never deleted (audit trail).
//!
//! ```text
//! pending → extracting → analyzing → {completed | needs_clarification | failed}
//! needs_clarification → analyzing → …   (resume loop)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The phase an analysis job is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
  Pending,
  Extracting,
  Analyzing,
  NeedsClarification,
  Completed,
  Failed,
}

impl JobPhase {
  /// Terminal phases are immutable (except the `starred` toggle on the
  /// associated result).
  pub fn is_terminal(self) -> bool {
    matches!(self, JobPhase::Completed | JobPhase::Failed)
  }

  /// Whether a direct transition `self → to` is part of the graph.
  ///
  /// `Failed` is reachable from every non-terminal phase; nothing leaves a
  /// terminal phase.
  pub fn can_transition(self, to: JobPhase) -> bool {
    use JobPhase::*;
    if self.is_terminal() {
      return false;
    }
    match (self, to) {
      (Pending, Extracting) => true,
      (Extracting, Analyzing) => true,
      (Analyzing, Completed | NeedsClarification) => true,
      (NeedsClarification, Analyzing) => true,
      (_, Failed) => true,
      _ => false,
    }
  }
}

/// One analysis attempt for one uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
  pub job_id:         Uuid,
  pub document_id:    Uuid,
  pub owner:          String,
  pub phase:          JobPhase,
  /// Opaque handle to the engine's in-progress run; required to resume after
  /// clarifications are answered. Absent before the first engine call.
  pub engine_run_ref: Option<String>,
  /// Present only when `phase` is `Failed`.
  pub error:          Option<String>,
  /// A normalized payload parked while consistency clarifications are open.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub draft_result:   Option<serde_json::Value>,
  pub created_at:     DateTime<Utc>,
  /// Refreshed on every phase transition; never decreases.
  pub updated_at:     DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::JobPhase::{self, *};

  const ALL: [JobPhase; 6] =
    [Pending, Extracting, Analyzing, NeedsClarification, Completed, Failed];

  #[test]
  fn happy_path_is_allowed() {
    assert!(Pending.can_transition(Extracting));
    assert!(Extracting.can_transition(Analyzing));
    assert!(Analyzing.can_transition(Completed));
    assert!(Analyzing.can_transition(NeedsClarification));
    assert!(NeedsClarification.can_transition(Analyzing));
  }

  #[test]
  fn failure_is_reachable_from_every_non_terminal_phase() {
    for from in [Pending, Extracting, Analyzing, NeedsClarification] {
      assert!(from.can_transition(Failed), "{from:?} → Failed");
    }
  }

  #[test]
  fn terminal_phases_never_move() {
    for to in ALL {
      assert!(!Completed.can_transition(to), "Completed → {to:?}");
      assert!(!Failed.can_transition(to), "Failed → {to:?}");
    }
  }

  #[test]
  fn no_backwards_or_skipping_edges() {
    assert!(!Analyzing.can_transition(Pending));
    assert!(!Analyzing.can_transition(Extracting));
    assert!(!Pending.can_transition(Analyzing));
    assert!(!Pending.can_transition(Completed));
    assert!(!Extracting.can_transition(NeedsClarification));
    assert!(!NeedsClarification.can_transition(Completed));
  }
}
