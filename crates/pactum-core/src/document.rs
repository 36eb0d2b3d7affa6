//! Document — the uploaded contract an analysis job is attached to.
//!
//! A document holds client-supplied metadata and the blob-store location of
//! the source file. Its `status` mirrors the terminal phases of its analysis
//! job so clients can poll either record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The client-visible status of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
  Processing,
  NeedsClarification,
  Completed,
  Failed,
}

/// An uploaded contract document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id: Uuid,
  /// Opaque external user id. Ownership scoping only; auth is out of scope.
  pub owner:       String,
  /// Free-form JSON object supplied by the client at upload time.
  pub metadata:    serde_json::Value,
  /// Blob-store URL (or key) of the source file.
  pub file_url:    String,
  pub status:      DocumentStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input for creating a [`Document`]. Ids and timestamps are store-assigned.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub owner:    String,
  pub metadata: serde_json::Value,
  pub file_url: String,
}
