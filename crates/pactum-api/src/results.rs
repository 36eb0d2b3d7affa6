//! Handlers for result retrieval and management.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/documents/:id/result` | Newest result for the document |
//! | `GET`    | `/results` | `?user=` required; `limit`, `offset`, `order` |
//! | `POST`   | `/documents/:id/result/star` | Toggle; returns the new value |
//! | `DELETE` | `/documents/:id/result` | Removes all results; 204 |
//!
//! Every route is owner-scoped: a result is only visible through its
//! owner's `user` parameter.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use pactum_core::{
  blob::BlobStore,
  engine::AnalysisEngine,
  result::StoredResult,
  store::{AnalysisStore, ResultQuery, SortOrder},
};
use pactum_orchestrator::Orchestrator;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct UserParam {
  pub user: String,
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /documents/:id/result?user=<owner>`
pub async fn get_one<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(document_id): Path<Uuid>,
  Query(params): Query<UserParam>,
) -> Result<Json<StoredResult>, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let result = ctx
    .store()
    .get_result(document_id, &params.user)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no result for document {document_id}"))
    })?;
  Ok(Json(result))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user:   String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
  /// `asc` (default) or `desc`, over insertion time.
  pub order:  Option<String>,
}

/// `GET /results?user=<owner>[&limit=..][&offset=..][&order=desc]`
pub async fn list<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<StoredResult>>, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let order = match params.order.as_deref() {
    None | Some("asc") => SortOrder::Asc,
    Some("desc") => SortOrder::Desc,
    Some(other) => {
      return Err(ApiError::BadRequest(format!(
        "unknown sort order {other:?}; expected `asc` or `desc`"
      )));
    }
  };
  let results = ctx
    .store()
    .list_results(&ResultQuery {
      owner: params.user,
      limit: params.limit,
      offset: params.offset,
      order,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(results))
}

// ─── Star ────────────────────────────────────────────────────────────────────

/// `POST /documents/:id/result/star?user=<owner>`
pub async fn star<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(document_id): Path<Uuid>,
  Query(params): Query<UserParam>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let starred = ctx
    .store()
    .toggle_star(document_id, &params.user)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no result for document {document_id}"))
    })?;
  Ok(Json(json!({ "starred": starred })))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /documents/:id/result?user=<owner>` — removes every stored result
/// for the document. The job history is untouched.
pub async fn delete<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  Path(document_id): Path<Uuid>,
  Query(params): Query<UserParam>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let deleted = ctx
    .store()
    .delete_results(document_id, &params.user)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!(
      "no result for document {document_id}"
    )));
  }
  Ok(StatusCode::NO_CONTENT)
}
