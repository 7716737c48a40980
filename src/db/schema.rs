//! Database schema and migrations for LANSHARE.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: stored files and key/value settings
    r#"
-- One row per stored object
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    orig_name   TEXT NOT NULL,               -- untrusted, display only
    stored_name TEXT NOT NULL UNIQUE,        -- random token + extension
    ext         TEXT NOT NULL DEFAULT '',
    mime        TEXT NOT NULL,
    category    TEXT NOT NULL,               -- image, video, archive, doc, other
    size_bytes  INTEGER NOT NULL,
    uploaded_at TEXT NOT NULL,
    expires_at  TEXT,                        -- NULL only when is_forever
    is_forever  INTEGER NOT NULL DEFAULT 0,
    downloads   INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX idx_files_category ON files(category);
CREATE INDEX idx_files_expiry ON files(is_forever, expires_at);

-- Administrative settings, string values
CREATE TABLE settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#,
];
