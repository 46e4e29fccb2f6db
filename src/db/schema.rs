//! Database schema and migrations for filegate.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: File registry
    r#"
CREATE TABLE files (
    id          TEXT PRIMARY KEY,        -- UUID v4
    user_id     TEXT NOT NULL,
    hash        TEXT,                    -- sha256 of extracted content
    filename    TEXT NOT NULL,
    path        TEXT,                    -- NULL for records without a blob
    data        TEXT NOT NULL DEFAULT '{}',  -- JSON object
    meta        TEXT NOT NULL DEFAULT '{}',  -- JSON object
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);

CREATE INDEX idx_files_user_id ON files(user_id);
CREATE INDEX idx_files_created_at ON files(created_at);
"#,
];
