//! Handlers for `/jobs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/jobs/:id` | Phase, error, timestamps — the polling endpoint |
//! | `GET`  | `/jobs/:id/clarifications` | All questions, open and resolved |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use pactum_core::{
  blob::BlobStore,
  clarification::Clarification,
  engine::AnalysisEngine,
  job::JobPhase,
  store::AnalysisStore,
};
use pactum_orchestrator::Orchestrator;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Client-facing view of a job. Internal bookkeeping (`engine_run_ref`,
/// `draft_result`) stays server-side.
#[derive(Debug, Serialize)]
pub struct JobStatus {
  pub job_id:      Uuid,
  pub document_id: Uuid,
  pub phase:       JobPhase,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:       Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// `GET /jobs/:id`
pub async fn get_one<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(id): Path<Uuid>,
) -> Result<Json<JobStatus>, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let job = ctx
    .store()
    .get_job(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("job {id} not found")))?;
  Ok(Json(JobStatus {
    job_id:      job.job_id,
    document_id: job.document_id,
    phase:       job.phase,
    error:       job.error,
    created_at:  job.created_at,
    updated_at:  job.updated_at,
  }))
}

/// `GET /jobs/:id/clarifications` — oldest first, resolved included.
pub async fn clarifications<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Clarification>>, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  if ctx.store().get_job(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("job {id} not found")));
  }
  let clarifications = ctx
    .store()
    .list_clarifications(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(clarifications))
}
