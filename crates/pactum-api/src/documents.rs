//! Handlers for `/documents` upload.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/documents` | Multipart `file` + `user` + optional `metadata`; returns 202 |

use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use pactum_core::{
  blob::BlobStore, engine::AnalysisEngine, store::AnalysisStore,
};
use pactum_orchestrator::{Orchestrator, SubmitDocument};
use serde_json::{Value, json};

use crate::error::ApiError;

fn bad(err: impl std::fmt::Display) -> ApiError {
  ApiError::BadRequest(err.to_string())
}

/// `POST /documents` — multipart fields:
///
///   * `file` — the PDF to analyze (required, non-empty, `.pdf`)
///   * `user` — the owner id (required)
///   * `metadata` — a JSON object as a string (optional)
///
/// All validation happens here, before any job exists; a rejected upload
/// leaves no trace. Returns `202 Accepted` with ids to poll.
pub async fn upload<S, E, B>(
  State(ctx): State<Orchestrator<S, E, B>>,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: AnalysisStore + 'static,
  E: AnalysisEngine + 'static,
  B: BlobStore + 'static,
{
  let mut file: Option<(String, Bytes)> = None;
  let mut metadata = Value::Object(Default::default());
  let mut user: Option<String> = None;

  while let Some(field) = multipart.next_field().await.map_err(bad)? {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "file" => {
        let filename = field
          .file_name()
          .unwrap_or("document.pdf")
          .to_owned();
        file = Some((filename, field.bytes().await.map_err(bad)?));
      }
      "metadata" => {
        let text = field.text().await.map_err(bad)?;
        let value: Value = serde_json::from_str(&text)
          .map_err(|e| bad(format!("malformed metadata: {e}")))?;
        if !value.is_object() {
          return Err(bad("metadata must be a JSON object"));
        }
        metadata = value;
      }
      "user" => user = Some(field.text().await.map_err(bad)?),
      _ => {}
    }
  }

  let (filename, bytes) =
    file.ok_or_else(|| bad("missing `file` field"))?;
  if bytes.is_empty() {
    return Err(bad("uploaded file is empty"));
  }
  if !filename.to_ascii_lowercase().ends_with(".pdf") {
    return Err(bad("only PDF documents are accepted"));
  }
  let owner = user.ok_or_else(|| bad("missing `user` field"))?;

  let submission = ctx
    .submit(SubmitDocument { owner, filename, metadata, bytes })
    .await
    .map_err(ApiError::store)?;

  Ok((
    StatusCode::ACCEPTED,
    Json(json!({
      "document_id": submission.document_id,
      "job_id":      submission.job_id,
      "file_url":    submission.file_url,
      "status":      "processing",
    })),
  ))
}
