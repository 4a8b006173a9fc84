//! SQL schema for the Uwazi SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Issues are never deleted. `seq` records submission order so that listings
-- are stable even when two submissions share a timestamp.
CREATE TABLE IF NOT EXISTS issues (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    issue_id       TEXT NOT NULL UNIQUE,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    category       TEXT NOT NULL,   -- Category label, e.g. 'water'
    severity       TEXT NOT NULL,   -- 'low' | 'medium' | 'high' | 'critical'
    status         TEXT NOT NULL,   -- 'open' | 'pending' | 'resolved' | 'closed'
    county         TEXT NOT NULL,
    constituency   TEXT NOT NULL,
    ward           TEXT NOT NULL,
    location       TEXT,
    latitude       REAL,
    longitude      REAL,
    submitted_by   TEXT NOT NULL,
    anonymous      INTEGER NOT NULL DEFAULT 0,
    date_submitted TEXT NOT NULL,   -- RFC 3339 UTC
    last_updated   TEXT NOT NULL,   -- RFC 3339 UTC
    upvotes        INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
    downvotes      INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
    tags           TEXT NOT NULL DEFAULT '[]'
);

-- At most one response per issue; a new response replaces the row.
CREATE TABLE IF NOT EXISTS admin_responses (
    issue_id     TEXT PRIMARY KEY REFERENCES issues(issue_id),
    response_id  TEXT NOT NULL,
    message      TEXT NOT NULL,
    responded_by TEXT NOT NULL,
    responded_at TEXT NOT NULL,
    is_public    INTEGER NOT NULL DEFAULT 1
);

-- Staff-only annotations; append-only.
CREATE TABLE IF NOT EXISTS internal_notes (
    note_id  TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL REFERENCES issues(issue_id),
    note     TEXT NOT NULL,
    added_by TEXT NOT NULL,
    added_at TEXT NOT NULL
);

-- Progress timeline; append-only. Non-public rows are staff-only.
CREATE TABLE IF NOT EXISTS issue_updates (
    update_id   TEXT PRIMARY KEY,
    issue_id    TEXT NOT NULL REFERENCES issues(issue_id),
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    updated_by  TEXT NOT NULL,
    posted_at   TEXT NOT NULL,
    is_public   INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS issues_county_idx ON issues(county);
CREATE INDEX IF NOT EXISTS issues_status_idx ON issues(status);
CREATE INDEX IF NOT EXISTS notes_issue_idx   ON internal_notes(issue_id);
CREATE INDEX IF NOT EXISTS updates_issue_idx ON issue_updates(issue_id);

PRAGMA user_version = 2;
";
