//! [`SqliteStore`] — the SQLite implementation of [`AnalysisStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use pactum_core::{
  ResolveError,
  clarification::{Clarification, ClarificationStatus, NewClarification},
  document::{Document, DocumentStatus, NewDocument},
  job::{Job, JobPhase},
  result::{NewResult, StoredResult},
  store::{AnalysisStore, ResultQuery, SortOrder},
};

use crate::{
  Error, Result,
  encode::{
    RawClarification, RawDocument, RawJob, RawResult, encode_clar_status,
    encode_doc_status, encode_dt, encode_options, encode_phase,
    encode_priority, encode_uuid,
  },
  schema::SCHEMA,
};

const JOB_COLUMNS: &str = "job_id, document_id, owner, phase, engine_run_ref, \
                           error, draft_result, created_at, updated_at";
const CLARIFICATION_COLUMNS: &str =
  "clarification_id, job_id, document_id, question, options, category, \
   priority, engine_ref, obligation_index, status, response, created_at, \
   resolved_at";
const RESULT_COLUMNS: &str =
  "result_id, document_id, job_id, owner, payload, starred, created_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pactum analysis store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn map_clarification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawClarification> {
    Ok(RawClarification {
      clarification_id: row.get(0)?,
      job_id:           row.get(1)?,
      document_id:      row.get(2)?,
      question:         row.get(3)?,
      options:          row.get(4)?,
      category:         row.get(5)?,
      priority:         row.get(6)?,
      engine_ref:       row.get(7)?,
      obligation_index: row.get(8)?,
      status:           row.get(9)?,
      response:         row.get(10)?,
      created_at:       row.get(11)?,
      resolved_at:      row.get(12)?,
    })
  }

  fn map_result_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawResult> {
    Ok(RawResult {
      result_id:   row.get(0)?,
      document_id: row.get(1)?,
      job_id:      row.get(2)?,
      owner:       row.get(3)?,
      payload:     row.get(4)?,
      starred:     row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  async fn fetch_clarification(&self, id: Uuid) -> Result<Option<Clarification>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawClarification> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CLARIFICATION_COLUMNS} FROM clarifications \
                 WHERE clarification_id = ?1"
              ),
              rusqlite::params![id_str],
              Self::map_clarification_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawClarification::into_clarification).transpose()
  }
}

// ─── AnalysisStore impl ──────────────────────────────────────────────────────

impl AnalysisStore for SqliteStore {
  type Error = Error;

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn create_document(&self, input: NewDocument) -> Result<Document> {
    let now = Utc::now();
    let document = Document {
      document_id: Uuid::new_v4(),
      owner:       input.owner,
      metadata:    input.metadata,
      file_url:    input.file_url,
      status:      DocumentStatus::Processing,
      created_at:  now,
      updated_at:  now,
    };

    let id_str       = encode_uuid(document.document_id);
    let owner        = document.owner.clone();
    let metadata_str = serde_json::to_string(&document.metadata)?;
    let file_url     = document.file_url.clone();
    let status_str   = encode_doc_status(document.status).to_owned();
    let at_str       = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             document_id, owner, metadata, file_url, status,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, owner, metadata_str, file_url, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(document)
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT document_id, owner, metadata, file_url, status, \
                      created_at, updated_at \
               FROM documents WHERE document_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawDocument {
                  document_id: row.get(0)?,
                  owner:       row.get(1)?,
                  metadata:    row.get(2)?,
                  file_url:    row.get(3)?,
                  status:      row.get(4)?,
                  created_at:  row.get(5)?,
                  updated_at:  row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn set_document_status(&self, id: Uuid, status: DocumentStatus) -> Result<()> {
    let id_str     = encode_uuid(id);
    let status_str = encode_doc_status(status).to_owned();
    let now_str    = encode_dt(Utc::now());

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE documents SET status = ?1, updated_at = ?2 WHERE document_id = ?3",
          rusqlite::params![status_str, now_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::DocumentNotFound(id));
    }
    Ok(())
  }

  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn create_job(&self, document_id: Uuid, owner: &str) -> Result<Job> {
    let now = Utc::now();
    let job = Job {
      job_id:         Uuid::new_v4(),
      document_id,
      owner:          owner.to_owned(),
      phase:          JobPhase::Pending,
      engine_run_ref: None,
      error:          None,
      draft_result:   None,
      created_at:     now,
      updated_at:     now,
    };

    let id_str    = encode_uuid(job.job_id);
    let doc_str   = encode_uuid(document_id);
    let owner     = job.owner.clone();
    let phase_str = encode_phase(job.phase).to_owned();
    let at_str    = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO jobs (job_id, document_id, owner, phase, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, doc_str, owner, phase_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(job)
  }

  async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
              rusqlite::params![id_str],
              |row| {
                Ok(RawJob {
                  job_id:         row.get(0)?,
                  document_id:    row.get(1)?,
                  owner:          row.get(2)?,
                  phase:          row.get(3)?,
                  engine_run_ref: row.get(4)?,
                  error:          row.get(5)?,
                  draft_result:   row.get(6)?,
                  created_at:     row.get(7)?,
                  updated_at:     row.get(8)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn advance_job(&self, id: Uuid, from: &[JobPhase], to: JobPhase) -> Result<bool> {
    // Only guard phases with a valid edge to `to`; this is what makes the
    // phase-forward property hold at the storage boundary, not just in the
    // orchestrator.
    let from_strs: Vec<String> = from
      .iter()
      .filter(|p| p.can_transition(to))
      .map(|p| encode_phase(*p).to_owned())
      .collect();
    if from_strs.is_empty() {
      return Ok(false);
    }

    let id_str  = encode_uuid(id);
    let to_str  = encode_phase(to).to_owned();
    let now_str = encode_dt(Utc::now());

    let updated: usize = self
      .conn
      .call(move |conn| {
        let placeholders =
          std::iter::repeat_n("?", from_strs.len()).collect::<Vec<_>>().join(", ");
        let sql = format!(
          "UPDATE jobs SET phase = ?, updated_at = ? \
           WHERE job_id = ? AND phase IN ({placeholders})"
        );
        let params = std::iter::once(to_str)
          .chain(std::iter::once(now_str))
          .chain(std::iter::once(id_str))
          .chain(from_strs);
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;

    Ok(updated == 1)
  }

  async fn fail_job(&self, id: Uuid, error: &str) -> Result<()> {
    let id_str    = encode_uuid(id);
    let error     = error.to_owned();
    let now_str   = encode_dt(Utc::now());

    // Terminal jobs are immutable; failing one is a no-op.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE jobs SET phase = 'failed', error = ?1, updated_at = ?2 \
           WHERE job_id = ?3 AND phase NOT IN ('completed', 'failed')",
          rusqlite::params![error, now_str, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_engine_run_ref(&self, id: Uuid, run_ref: &str) -> Result<()> {
    let id_str  = encode_uuid(id);
    let run_ref = run_ref.to_owned();

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE jobs SET engine_run_ref = ?1 WHERE job_id = ?2",
          rusqlite::params![run_ref, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::JobNotFound(id));
    }
    Ok(())
  }

  async fn set_draft_result(&self, id: Uuid, draft: Option<serde_json::Value>) -> Result<()> {
    let id_str    = encode_uuid(id);
    let draft_str = draft.map(|v| serde_json::to_string(&v)).transpose()?;

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE jobs SET draft_result = ?1 WHERE job_id = ?2",
          rusqlite::params![draft_str, id_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::JobNotFound(id));
    }
    Ok(())
  }

  // ── Clarifications ────────────────────────────────────────────────────────

  async fn create_clarification(&self, input: NewClarification) -> Result<Clarification> {
    let clarification = Clarification {
      clarification_id: Uuid::new_v4(),
      job_id:           input.job_id,
      document_id:      input.document_id,
      question:         input.question,
      options:          input.options,
      category:         input.category,
      priority:         input.priority,
      engine_ref:       input.engine_ref,
      obligation_index: input.obligation_index,
      status:           ClarificationStatus::Open,
      response:         None,
      created_at:       Utc::now(),
      resolved_at:      None,
    };

    let id_str       = encode_uuid(clarification.clarification_id);
    let job_str      = encode_uuid(clarification.job_id);
    let doc_str      = encode_uuid(clarification.document_id);
    let question     = clarification.question.clone();
    let options_str  = encode_options(&clarification.options)?;
    let category     = clarification.category.clone();
    let priority_str = encode_priority(clarification.priority).to_owned();
    let engine_ref   = clarification.engine_ref.clone();
    let index        = clarification.obligation_index.map(|i| i as i64);
    let status_str   = encode_clar_status(clarification.status).to_owned();
    let at_str       = encode_dt(clarification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clarifications (
             clarification_id, job_id, document_id, question, options,
             category, priority, engine_ref, obligation_index, status,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            job_str,
            doc_str,
            question,
            options_str,
            category,
            priority_str,
            engine_ref,
            index,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(clarification)
  }

  async fn get_clarification(&self, id: Uuid) -> Result<Option<Clarification>> {
    self.fetch_clarification(id).await
  }

  async fn list_clarifications(&self, job_id: Uuid) -> Result<Vec<Clarification>> {
    let job_str = encode_uuid(job_id);

    let raws: Vec<RawClarification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CLARIFICATION_COLUMNS} FROM clarifications \
           WHERE job_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![job_str], Self::map_clarification_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawClarification::into_clarification)
      .collect()
  }

  async fn resolve_clarification(
    &self,
    id: Uuid,
    response: &str,
  ) -> Result<Clarification, ResolveError<Error>> {
    let id_str   = encode_uuid(id);
    let response = response.to_owned();
    let now_str  = encode_dt(Utc::now());

    // Compare-and-set on status so concurrent resolvers of the same question
    // cannot both succeed.
    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE clarifications \
           SET status = 'resolved', response = ?1, resolved_at = ?2 \
           WHERE clarification_id = ?3 AND status = 'open'",
          rusqlite::params![response, now_str, id_str],
        )?)
      })
      .await
      .map_err(|e| ResolveError::Store(e.into()))?;

    let row = self
      .fetch_clarification(id)
      .await
      .map_err(ResolveError::Store)?;

    match (updated, row) {
      (1, Some(clarification)) => Ok(clarification),
      (_, Some(_)) => Err(ResolveError::AlreadyResolved(id)),
      (_, None) => Err(ResolveError::NotFound(id)),
    }
  }

  async fn try_begin_resume(&self, job_id: Uuid) -> Result<bool> {
    let job_str = encode_uuid(job_id);
    let now_str = encode_dt(Utc::now());

    // One transaction: the open-count check and the phase CAS must be atomic
    // so exactly one of any number of concurrent resolvers wins.
    let updated: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let open: i64 = tx.query_row(
          "SELECT COUNT(*) FROM clarifications \
           WHERE job_id = ?1 AND status = 'open'",
          rusqlite::params![job_str],
          |row| row.get(0),
        )?;
        if open > 0 {
          tx.commit()?;
          return Ok(0);
        }

        let updated = tx.execute(
          "UPDATE jobs SET phase = 'analyzing', updated_at = ?1 \
           WHERE job_id = ?2 AND phase = 'needs_clarification'",
          rusqlite::params![now_str, job_str],
        )?;
        tx.commit()?;
        Ok(updated)
      })
      .await?;

    Ok(updated == 1)
  }

  // ── Results ───────────────────────────────────────────────────────────────

  async fn insert_result(&self, input: NewResult) -> Result<StoredResult> {
    let result = StoredResult {
      result_id:   Uuid::new_v4(),
      document_id: input.document_id,
      job_id:      input.job_id,
      owner:       input.owner,
      payload:     input.payload,
      starred:     false,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(result.result_id);
    let doc_str     = encode_uuid(result.document_id);
    let job_str     = encode_uuid(result.job_id);
    let owner       = result.owner.clone();
    let payload_str = serde_json::to_string(&result.payload)?;
    let at_str      = encode_dt(result.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO results (
             result_id, document_id, job_id, owner, payload, starred, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![id_str, doc_str, job_str, owner, payload_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(result)
  }

  async fn get_result(&self, document_id: Uuid, owner: &str) -> Result<Option<StoredResult>> {
    let doc_str = encode_uuid(document_id);
    let owner   = owner.to_owned();

    let raw: Option<RawResult> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RESULT_COLUMNS} FROM results \
                 WHERE document_id = ?1 AND owner = ?2 \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
              ),
              rusqlite::params![doc_str, owner],
              Self::map_result_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResult::into_result).transpose()
  }

  async fn list_results(&self, query: &ResultQuery) -> Result<Vec<StoredResult>> {
    let owner      = query.owner.clone();
    // SQLite treats LIMIT -1 as "no limit".
    let limit_val  = query.limit.map(|l| l as i64).unwrap_or(-1);
    let offset_val = query.offset.unwrap_or(0) as i64;
    let direction  = match query.order {
      SortOrder::Asc => "ASC",
      SortOrder::Desc => "DESC",
    };

    let raws: Vec<RawResult> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RESULT_COLUMNS} FROM results WHERE owner = ?1 \
           ORDER BY created_at {direction}, rowid {direction} \
           LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner, limit_val, offset_val],
            Self::map_result_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResult::into_result).collect()
  }

  async fn toggle_star(&self, document_id: Uuid, owner: &str) -> Result<Option<bool>> {
    let doc_str = encode_uuid(document_id);
    let owner   = owner.to_owned();

    let starred: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let target: Option<String> = tx
          .query_row(
            "SELECT result_id FROM results \
             WHERE document_id = ?1 AND owner = ?2 \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            rusqlite::params![doc_str, owner],
            |row| row.get(0),
          )
          .optional()?;

        let Some(result_id) = target else {
          tx.commit()?;
          return Ok(None);
        };

        tx.execute(
          "UPDATE results SET starred = 1 - starred WHERE result_id = ?1",
          rusqlite::params![result_id],
        )?;
        let value: i64 = tx.query_row(
          "SELECT starred FROM results WHERE result_id = ?1",
          rusqlite::params![result_id],
          |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(Some(value))
      })
      .await?;

    Ok(starred.map(|v| v != 0))
  }

  async fn delete_results(&self, document_id: Uuid, owner: &str) -> Result<bool> {
    let doc_str = encode_uuid(document_id);
    let owner   = owner.to_owned();

    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM results WHERE document_id = ?1 AND owner = ?2",
          rusqlite::params![doc_str, owner],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }
}
