//! SQL schema for the GAC SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS platforms (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    slug          TEXT NOT NULL UNIQUE,     -- lowercase
    display_name  TEXT NOT NULL,
    enabled       INTEGER NOT NULL DEFAULT 1
);

-- One row per (email, platform); writes go through upsert.
CREATE TABLE IF NOT EXISTS access_entries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    email        TEXT NOT NULL,             -- lowercase, trimmed
    access_code  TEXT NOT NULL,             -- plain credential or OAuth sentinel
    platform_id  INTEGER NOT NULL REFERENCES platforms(id),
    enabled      INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (email, platform_id)
);

-- Written by the ingestion worker only.
CREATE TABLE IF NOT EXISTS codes (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    platform_id      INTEGER NOT NULL REFERENCES platforms(id),
    recipient_email  TEXT NOT NULL,         -- lowercase, trimmed
    code             TEXT,
    email_from       TEXT,
    subject          TEXT,
    email_body       TEXT,
    received_at      TEXT NOT NULL,         -- fixed-width RFC 3339 UTC; sorts lexically
    origin           TEXT NOT NULL          -- 'imap' | 'gmail' | 'outlook'
);

CREATE TABLE IF NOT EXISTS settings (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS codes_lookup_idx
    ON codes(platform_id, recipient_email, received_at);

PRAGMA user_version = 1;
";

pub const MASTER_CONSULT_ENABLED: &str = "master_consult_enabled";
pub const MASTER_CONSULT_USERNAME: &str = "master_consult_username";
