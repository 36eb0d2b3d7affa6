//! SQL schema for the Pactum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    owner       TEXT NOT NULL,
    metadata    TEXT NOT NULL,   -- client-supplied JSON object
    file_url    TEXT NOT NULL,
    status      TEXT NOT NULL,   -- 'processing' | 'needs_clarification' | 'completed' | 'failed'
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at  TEXT NOT NULL
);

-- Jobs are never deleted (audit trail).
-- The orchestrator is the only writer of phase transitions.
CREATE TABLE IF NOT EXISTS jobs (
    job_id         TEXT PRIMARY KEY,
    document_id    TEXT NOT NULL REFERENCES documents(document_id),
    owner          TEXT NOT NULL,
    phase          TEXT NOT NULL DEFAULT 'pending',
    engine_run_ref TEXT,
    error          TEXT,            -- set only when phase = 'failed'
    draft_result   TEXT,            -- JSON payload parked during consistency pauses
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS clarifications (
    clarification_id TEXT PRIMARY KEY,
    job_id           TEXT NOT NULL REFERENCES jobs(job_id),
    document_id      TEXT NOT NULL REFERENCES documents(document_id),
    question         TEXT NOT NULL,
    options          TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    category         TEXT,
    priority         TEXT NOT NULL DEFAULT 'medium',
    engine_ref       TEXT,            -- NULL for locally-raised questions
    obligation_index INTEGER,
    status           TEXT NOT NULL DEFAULT 'open', -- 'open' | 'resolved'
    response         TEXT,
    created_at       TEXT NOT NULL,
    resolved_at      TEXT,
    CHECK (status != 'resolved' OR response IS NOT NULL)
);

-- Results are append-capable; the newest row is the current result.
CREATE TABLE IF NOT EXISTS results (
    result_id   TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(document_id),
    job_id      TEXT NOT NULL REFERENCES jobs(job_id),
    owner       TEXT NOT NULL,
    payload     TEXT NOT NULL,       -- JSON AnalysisPayload
    starred     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS jobs_document_idx         ON jobs(document_id);
CREATE INDEX IF NOT EXISTS clarifications_job_idx    ON clarifications(job_id, status);
CREATE INDEX IF NOT EXISTS results_document_idx      ON results(document_id, owner);
CREATE INDEX IF NOT EXISTS results_owner_created_idx ON results(owner, created_at);

PRAGMA user_version = 1;
";
