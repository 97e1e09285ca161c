//! SQL migration definitions for the notesgen database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: syllabi documents, run leases",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One JSON document per syllabus tree, shaped like SyllabusTree
CREATE TABLE IF NOT EXISTS syllabi (
    id          TEXT PRIMARY KEY,
    root_topic  TEXT NOT NULL,
    document    TEXT NOT NULL CHECK (json_valid(document)),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_syllabi_created_at ON syllabi(created_at);

-- Single-writer lease per tree; timestamps are unix millis
CREATE TABLE IF NOT EXISTS run_leases (
    tree_id      TEXT PRIMARY KEY REFERENCES syllabi(id) ON DELETE CASCADE,
    holder       TEXT NOT NULL,
    acquired_at  INTEGER NOT NULL,
    heartbeat_at INTEGER NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
