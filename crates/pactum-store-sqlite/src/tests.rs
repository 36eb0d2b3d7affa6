//! Integration tests for `SqliteStore` against an in-memory database.

use pactum_core::{
  ResolveError,
  clarification::{ClarificationStatus, NewClarification, Priority},
  document::{DocumentStatus, NewDocument},
  engine::EngineClarification,
  job::JobPhase,
  result::{
    AnalysisPayload, Loose, NewResult, Obligation, RiskAssessment, RiskLevel,
  },
  store::{AnalysisStore, ResultQuery, SortOrder},
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn document(s: &SqliteStore, owner: &str) -> pactum_core::document::Document {
  s.create_document(NewDocument {
    owner:    owner.into(),
    metadata: json!({ "title": "MSA" }),
    file_url: format!("blob://{owner}/msa.pdf"),
  })
  .await
  .unwrap()
}

fn payload(confidence: f64) -> AnalysisPayload {
  AnalysisPayload {
    summary:          "A master services agreement.".into(),
    parties:          vec!["Acme Corp".into(), "Bolt LLC".into()],
    dates:            Loose::default(),
    obligations:      vec![Obligation {
      party: "Acme Corp".into(),
      text:  "Pay invoices within 30 days.".into(),
    }],
    financial_terms:  vec![json!({ "description": "$10k/month" })],
    risk_assessment:  Loose::Parsed(RiskAssessment {
      risk_level:      RiskLevel::Medium,
      factors:         vec!["auto-renewal".into()],
      recommendations: vec![],
    }),
    confidence_score: confidence,
    unclear_sections: vec![],
  }
}

fn engine_question(n: usize) -> EngineClarification {
  EngineClarification {
    engine_ref: format!("clar-{n}"),
    question:   format!("Question {n}?"),
    options:    vec!["yes".into(), "no".into()],
    category:   Some("multiple_choice".into()),
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_document() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  assert_eq!(doc.status, DocumentStatus::Processing);

  let fetched = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(fetched.document_id, doc.document_id);
  assert_eq!(fetched.owner, "user-1");
  assert_eq!(fetched.metadata, json!({ "title": "MSA" }));
}

#[tokio::test]
async fn get_document_missing_returns_none() {
  let s = store().await;
  assert!(s.get_document(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn set_document_status_roundtrip() {
  let s = store().await;
  let doc = document(&s, "user-1").await;

  s.set_document_status(doc.document_id, DocumentStatus::Completed)
    .await
    .unwrap();

  let fetched = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, DocumentStatus::Completed);
  assert!(fetched.updated_at >= doc.updated_at);
}

#[tokio::test]
async fn set_document_status_missing_errors() {
  let s = store().await;
  let err = s
    .set_document_status(Uuid::new_v4(), DocumentStatus::Failed)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DocumentNotFound(_)));
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_job_starts_pending() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  assert_eq!(job.phase, JobPhase::Pending);
  assert!(job.engine_run_ref.is_none());
  assert!(job.error.is_none());

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.job_id, job.job_id);
  assert_eq!(fetched.document_id, doc.document_id);
  assert_eq!(fetched.phase, JobPhase::Pending);
}

#[tokio::test]
async fn advance_job_is_a_compare_and_set() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  // Winning CAS.
  assert!(
    s.advance_job(job.job_id, &[JobPhase::Pending], JobPhase::Extracting)
      .await
      .unwrap()
  );
  // Same guard again: the phase has moved on, so the CAS loses.
  assert!(
    !s.advance_job(job.job_id, &[JobPhase::Pending], JobPhase::Extracting)
      .await
      .unwrap()
  );
  // Guard with the wrong phase loses too.
  assert!(
    !s.advance_job(job.job_id, &[JobPhase::Analyzing], JobPhase::Completed)
      .await
      .unwrap()
  );

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.phase, JobPhase::Extracting);
  assert!(fetched.updated_at >= job.updated_at);
}

#[tokio::test]
async fn advance_job_accepts_multiple_from_phases() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  assert!(
    s.advance_job(
      job.job_id,
      &[JobPhase::Pending, JobPhase::Extracting],
      JobPhase::Extracting,
    )
    .await
    .unwrap()
  );
}

#[tokio::test]
async fn terminal_job_cannot_be_advanced_or_refailed() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  s.fail_job(job.job_id, "engine exploded").await.unwrap();
  let failed = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(failed.phase, JobPhase::Failed);
  assert_eq!(failed.error.as_deref(), Some("engine exploded"));

  // No edge leaves a terminal phase.
  assert!(
    !s.advance_job(job.job_id, &[JobPhase::Failed], JobPhase::Analyzing)
      .await
      .unwrap()
  );
  assert_eq!(
    s.get_job(job.job_id).await.unwrap().unwrap().phase,
    JobPhase::Failed
  );
  s.fail_job(job.job_id, "second error").await.unwrap();
  let still = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(still.error.as_deref(), Some("engine exploded"));
}

#[tokio::test]
async fn engine_run_ref_and_draft_roundtrip() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  s.set_engine_run_ref(job.job_id, "run-42").await.unwrap();
  s.set_draft_result(job.job_id, Some(json!({ "summary": "draft" })))
    .await
    .unwrap();

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.engine_run_ref.as_deref(), Some("run-42"));
  assert_eq!(fetched.draft_result, Some(json!({ "summary": "draft" })));

  s.set_draft_result(job.job_id, None).await.unwrap();
  let cleared = s.get_job(job.job_id).await.unwrap().unwrap();
  assert!(cleared.draft_result.is_none());
}

#[tokio::test]
async fn set_engine_run_ref_missing_job_errors() {
  let s = store().await;
  let err = s.set_engine_run_ref(Uuid::new_v4(), "run-1").await.unwrap_err();
  assert!(matches!(err, crate::Error::JobNotFound(_)));
}

// ─── Clarifications ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_list_clarifications() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  let first = s
    .create_clarification(NewClarification::from_engine(
      job.job_id,
      doc.document_id,
      engine_question(1),
    ))
    .await
    .unwrap();
  let second = s
    .create_clarification(NewClarification::consistency(
      job.job_id,
      doc.document_id,
      2,
      "Ghost Inc",
      &["Acme Corp".into()],
    ))
    .await
    .unwrap();

  assert_eq!(first.priority, Priority::High);
  assert_eq!(first.engine_ref.as_deref(), Some("clar-1"));
  assert_eq!(second.engine_ref, None);
  assert_eq!(second.obligation_index, Some(2));
  assert_eq!(second.category.as_deref(), Some("consistency"));

  let listed = s.list_clarifications(job.job_id).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].clarification_id, first.clarification_id);
  assert_eq!(listed[0].options, vec!["yes", "no"]);
  assert!(listed.iter().all(|c| c.is_open()));
}

#[tokio::test]
async fn resolve_sets_response_and_timestamp() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  let clar = s
    .create_clarification(NewClarification::from_engine(
      job.job_id,
      doc.document_id,
      engine_question(1),
    ))
    .await
    .unwrap();

  let resolved = s
    .resolve_clarification(clar.clarification_id, "yes")
    .await
    .unwrap();
  assert_eq!(resolved.status, ClarificationStatus::Resolved);
  assert_eq!(resolved.response.as_deref(), Some("yes"));
  assert!(resolved.resolved_at.is_some());
}

#[tokio::test]
async fn resolve_twice_is_rejected_not_ignored() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  let clar = s
    .create_clarification(NewClarification::from_engine(
      job.job_id,
      doc.document_id,
      engine_question(1),
    ))
    .await
    .unwrap();

  s.resolve_clarification(clar.clarification_id, "yes")
    .await
    .unwrap();
  let err = s
    .resolve_clarification(clar.clarification_id, "no")
    .await
    .unwrap_err();
  assert!(matches!(err, ResolveError::AlreadyResolved(id) if id == clar.clarification_id));

  // The first answer stands.
  let fetched = s
    .get_clarification(clar.clarification_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.response.as_deref(), Some("yes"));
}

#[tokio::test]
async fn resolve_unknown_clarification_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.resolve_clarification(id, "yes").await.unwrap_err();
  assert!(matches!(err, ResolveError::NotFound(got) if got == id));
}

// ─── Resume trigger ──────────────────────────────────────────────────────────

/// Drive a job into `needs_clarification` with `n` open clarifications.
async fn paused_job(
  s: &SqliteStore,
  n: usize,
) -> (pactum_core::job::Job, Vec<pactum_core::clarification::Clarification>) {
  let doc = document(s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  s.advance_job(job.job_id, &[JobPhase::Pending], JobPhase::Extracting)
    .await
    .unwrap();
  s.advance_job(job.job_id, &[JobPhase::Extracting], JobPhase::Analyzing)
    .await
    .unwrap();

  let mut clars = Vec::new();
  for i in 0..n {
    clars.push(
      s.create_clarification(NewClarification::from_engine(
        job.job_id,
        doc.document_id,
        engine_question(i),
      ))
      .await
      .unwrap(),
    );
  }
  s.advance_job(job.job_id, &[JobPhase::Analyzing], JobPhase::NeedsClarification)
    .await
    .unwrap();
  (s.get_job(job.job_id).await.unwrap().unwrap(), clars)
}

#[tokio::test]
async fn resume_is_blocked_while_clarifications_are_open() {
  let s = store().await;
  let (job, clars) = paused_job(&s, 2).await;

  assert!(!s.try_begin_resume(job.job_id).await.unwrap());

  s.resolve_clarification(clars[0].clarification_id, "yes")
    .await
    .unwrap();
  assert!(!s.try_begin_resume(job.job_id).await.unwrap());

  s.resolve_clarification(clars[1].clarification_id, "no")
    .await
    .unwrap();
  assert!(s.try_begin_resume(job.job_id).await.unwrap());

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.phase, JobPhase::Analyzing);

  // A second trigger with no new answers is a no-op.
  assert!(!s.try_begin_resume(job.job_id).await.unwrap());
}

#[tokio::test]
async fn racing_resolvers_produce_exactly_one_resume() {
  let s = store().await;
  let (job, clars) = paused_job(&s, 2).await;

  let a = {
    let s = s.clone();
    let id = clars[0].clarification_id;
    let job_id = job.job_id;
    tokio::spawn(async move {
      s.resolve_clarification(id, "yes").await.unwrap();
      s.try_begin_resume(job_id).await.unwrap()
    })
  };
  let b = {
    let s = s.clone();
    let id = clars[1].clarification_id;
    let job_id = job.job_id;
    tokio::spawn(async move {
      s.resolve_clarification(id, "no").await.unwrap();
      s.try_begin_resume(job_id).await.unwrap()
    })
  };

  let (a, b) = (a.await.unwrap(), b.await.unwrap());
  assert_eq!(
    u8::from(a) + u8::from(b),
    1,
    "exactly one resolver must win the resume trigger"
  );
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_newest_result() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  let older = s
    .insert_result(NewResult {
      document_id: doc.document_id,
      job_id:      job.job_id,
      owner:       "user-1".into(),
      payload:     payload(0.5),
    })
    .await
    .unwrap();
  let newer = s
    .insert_result(NewResult {
      document_id: doc.document_id,
      job_id:      job.job_id,
      owner:       "user-1".into(),
      payload:     payload(0.9),
    })
    .await
    .unwrap();

  let current = s
    .get_result(doc.document_id, "user-1")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(current.result_id, newer.result_id);
  assert_ne!(current.result_id, older.result_id);
  assert!(!current.starred);
}

#[tokio::test]
async fn results_are_owner_scoped() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  s.insert_result(NewResult {
    document_id: doc.document_id,
    job_id:      job.job_id,
    owner:       "user-1".into(),
    payload:     payload(0.8),
  })
  .await
  .unwrap();

  assert!(
    s.get_result(doc.document_id, "someone-else")
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn list_results_paginates_stably() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  let mut ids = Vec::new();
  for i in 0..5 {
    let r = s
      .insert_result(NewResult {
        document_id: doc.document_id,
        job_id:      job.job_id,
        owner:       "user-1".into(),
        payload:     payload(0.1 * (i as f64 + 1.0)),
      })
      .await
      .unwrap();
    ids.push(r.result_id);
  }

  let page = s
    .list_results(&ResultQuery {
      owner:  "user-1".into(),
      limit:  Some(2),
      offset: Some(1),
      order:  SortOrder::Asc,
    })
    .await
    .unwrap();
  assert_eq!(
    page.iter().map(|r| r.result_id).collect::<Vec<_>>(),
    vec![ids[1], ids[2]]
  );

  let newest_first = s
    .list_results(&ResultQuery {
      owner:  "user-1".into(),
      limit:  Some(1),
      offset: None,
      order:  SortOrder::Desc,
    })
    .await
    .unwrap();
  assert_eq!(newest_first[0].result_id, ids[4]);

  let everything = s
    .list_results(&ResultQuery::for_owner("user-1"))
    .await
    .unwrap();
  assert_eq!(everything.len(), 5);
}

#[tokio::test]
async fn toggle_star_flips_the_newest_result() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  s.insert_result(NewResult {
    document_id: doc.document_id,
    job_id:      job.job_id,
    owner:       "user-1".into(),
    payload:     payload(0.8),
  })
  .await
  .unwrap();

  assert_eq!(s.toggle_star(doc.document_id, "user-1").await.unwrap(), Some(true));
  assert_eq!(s.toggle_star(doc.document_id, "user-1").await.unwrap(), Some(false));
  assert_eq!(s.toggle_star(doc.document_id, "nobody").await.unwrap(), None);
}

#[tokio::test]
async fn delete_results_reports_whether_anything_existed() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();
  s.insert_result(NewResult {
    document_id: doc.document_id,
    job_id:      job.job_id,
    owner:       "user-1".into(),
    payload:     payload(0.8),
  })
  .await
  .unwrap();

  assert!(s.delete_results(doc.document_id, "user-1").await.unwrap());
  assert!(!s.delete_results(doc.document_id, "user-1").await.unwrap());
  assert!(s.get_result(doc.document_id, "user-1").await.unwrap().is_none());

  // The job survives result deletion (audit trail).
  assert!(s.get_job(job.job_id).await.unwrap().is_some());
}

#[tokio::test]
async fn payload_roundtrips_through_json_column() {
  let s = store().await;
  let doc = document(&s, "user-1").await;
  let job = s.create_job(doc.document_id, "user-1").await.unwrap();

  let stored = s
    .insert_result(NewResult {
      document_id: doc.document_id,
      job_id:      job.job_id,
      owner:       "user-1".into(),
      payload:     payload(0.87),
    })
    .await
    .unwrap();

  let fetched = s
    .get_result(doc.document_id, "user-1")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.payload.summary, stored.payload.summary);
  assert_eq!(fetched.payload.parties, stored.payload.parties);
  assert_eq!(fetched.payload.confidence_score, 0.87);
  assert_eq!(
    fetched
      .payload
      .risk_assessment
      .as_parsed()
      .unwrap()
      .risk_level,
    RiskLevel::Medium
  );
}
