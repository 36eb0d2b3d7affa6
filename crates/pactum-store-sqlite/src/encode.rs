//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields
//! (metadata, options, payloads, drafts) are stored as compact JSON. UUIDs
//! are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use pactum_core::{
  clarification::{Clarification, ClarificationStatus, Priority},
  document::{Document, DocumentStatus},
  job::{Job, JobPhase},
  result::StoredResult,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DocumentStatus ──────────────────────────────────────────────────────────

pub fn encode_doc_status(s: DocumentStatus) -> &'static str {
  match s {
    DocumentStatus::Processing => "processing",
    DocumentStatus::NeedsClarification => "needs_clarification",
    DocumentStatus::Completed => "completed",
    DocumentStatus::Failed => "failed",
  }
}

pub fn decode_doc_status(s: &str) -> Result<DocumentStatus> {
  match s {
    "processing" => Ok(DocumentStatus::Processing),
    "needs_clarification" => Ok(DocumentStatus::NeedsClarification),
    "completed" => Ok(DocumentStatus::Completed),
    "failed" => Ok(DocumentStatus::Failed),
    other => Err(Error::Decode(format!("unknown document status: {other:?}"))),
  }
}

// ─── JobPhase ────────────────────────────────────────────────────────────────

pub fn encode_phase(p: JobPhase) -> &'static str {
  match p {
    JobPhase::Pending => "pending",
    JobPhase::Extracting => "extracting",
    JobPhase::Analyzing => "analyzing",
    JobPhase::NeedsClarification => "needs_clarification",
    JobPhase::Completed => "completed",
    JobPhase::Failed => "failed",
  }
}

pub fn decode_phase(s: &str) -> Result<JobPhase> {
  match s {
    "pending" => Ok(JobPhase::Pending),
    "extracting" => Ok(JobPhase::Extracting),
    "analyzing" => Ok(JobPhase::Analyzing),
    "needs_clarification" => Ok(JobPhase::NeedsClarification),
    "completed" => Ok(JobPhase::Completed),
    "failed" => Ok(JobPhase::Failed),
    other => Err(Error::Decode(format!("unknown job phase: {other:?}"))),
  }
}

// ─── Priority / ClarificationStatus ──────────────────────────────────────────

pub fn encode_priority(p: Priority) -> &'static str {
  match p {
    Priority::Low => "low",
    Priority::Medium => "medium",
    Priority::High => "high",
  }
}

pub fn decode_priority(s: &str) -> Result<Priority> {
  match s {
    "low" => Ok(Priority::Low),
    "medium" => Ok(Priority::Medium),
    "high" => Ok(Priority::High),
    other => Err(Error::Decode(format!("unknown priority: {other:?}"))),
  }
}

pub fn encode_clar_status(s: ClarificationStatus) -> &'static str {
  match s {
    ClarificationStatus::Open => "open",
    ClarificationStatus::Resolved => "resolved",
  }
}

pub fn decode_clar_status(s: &str) -> Result<ClarificationStatus> {
  match s {
    "open" => Ok(ClarificationStatus::Open),
    "resolved" => Ok(ClarificationStatus::Resolved),
    other => {
      Err(Error::Decode(format!("unknown clarification status: {other:?}")))
    }
  }
}

// ─── Options ─────────────────────────────────────────────────────────────────

pub fn encode_options(options: &[String]) -> Result<String> {
  Ok(serde_json::to_string(options)?)
}

pub fn decode_options(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub document_id: String,
  pub owner:       String,
  pub metadata:    String,
  pub file_url:    String,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id: decode_uuid(&self.document_id)?,
      owner:       self.owner,
      metadata:    serde_json::from_str(&self.metadata)?,
      file_url:    self.file_url,
      status:      decode_doc_status(&self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `jobs` row.
pub struct RawJob {
  pub job_id:         String,
  pub document_id:    String,
  pub owner:          String,
  pub phase:          String,
  pub engine_run_ref: Option<String>,
  pub error:          Option<String>,
  pub draft_result:   Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawJob {
  pub fn into_job(self) -> Result<Job> {
    Ok(Job {
      job_id:         decode_uuid(&self.job_id)?,
      document_id:    decode_uuid(&self.document_id)?,
      owner:          self.owner,
      phase:          decode_phase(&self.phase)?,
      engine_run_ref: self.engine_run_ref,
      error:          self.error,
      draft_result:   self
        .draft_result
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `clarifications` row.
pub struct RawClarification {
  pub clarification_id: String,
  pub job_id:           String,
  pub document_id:      String,
  pub question:         String,
  pub options:          String,
  pub category:         Option<String>,
  pub priority:         String,
  pub engine_ref:       Option<String>,
  pub obligation_index: Option<i64>,
  pub status:           String,
  pub response:         Option<String>,
  pub created_at:       String,
  pub resolved_at:      Option<String>,
}

impl RawClarification {
  pub fn into_clarification(self) -> Result<Clarification> {
    Ok(Clarification {
      clarification_id: decode_uuid(&self.clarification_id)?,
      job_id:           decode_uuid(&self.job_id)?,
      document_id:      decode_uuid(&self.document_id)?,
      question:         self.question,
      options:          decode_options(&self.options)?,
      category:         self.category,
      priority:         decode_priority(&self.priority)?,
      engine_ref:       self.engine_ref,
      obligation_index: self.obligation_index.map(|i| i as usize),
      status:           decode_clar_status(&self.status)?,
      response:         self.response,
      created_at:       decode_dt(&self.created_at)?,
      resolved_at:      self
        .resolved_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Raw strings read directly from a `results` row.
pub struct RawResult {
  pub result_id:   String,
  pub document_id: String,
  pub job_id:      String,
  pub owner:       String,
  pub payload:     String,
  pub starred:     i64,
  pub created_at:  String,
}

impl RawResult {
  pub fn into_result(self) -> Result<StoredResult> {
    Ok(StoredResult {
      result_id:   decode_uuid(&self.result_id)?,
      document_id: decode_uuid(&self.document_id)?,
      job_id:      decode_uuid(&self.job_id)?,
      owner:       self.owner,
      payload:     serde_json::from_str(&self.payload)?,
      starred:     self.starred != 0,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
