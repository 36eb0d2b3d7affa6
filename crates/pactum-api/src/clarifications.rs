//! Handler for `/clarifications/:id/resolve`.

use axum::{
  Json,
  extract::{Path, State},
};
use pactum_core::{
  ResolveError, blob::BlobStore, clarification::Clarification,
  engine::AnalysisEngine, store::AnalysisStore,
};
use pactum_orchestrator::Orchestrator;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
  pub response: String,
}

/// `POST /clarifications/:id/resolve` — body `{"response": "..."}`.
///
/// Resolving the last open question for a job triggers the resume in the
/// background; the response returns immediately with the resolved
/// clarification. Re-resolving is a 409, never a silent no-op.
pub async fn resolve<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ResolveBody>,
) -> Result<Json<Clarification>, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let response = body.response.trim();
  if response.is_empty() {
    return Err(ApiError::BadRequest("response must not be empty".into()));
  }

  let clarification =
    ctx.resolve_clarification(id, response).await.map_err(|e| match e {
      ResolveError::NotFound(id) => {
        ApiError::NotFound(format!("clarification {id} not found"))
      }
      ResolveError::AlreadyResolved(id) => ApiError::AlreadyResolved(id),
      ResolveError::Store(e) => ApiError::store(e),
    })?;
  Ok(Json(clarification))
}
