//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use sym_core::error::{Result, SymError};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| SymError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| SymError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: feedback_records");
    }

    if current_version < 2 {
        apply_v2(conn)?;
        info!("Applied migration v2: vector_entries");
    }

    Ok(())
}

/// Version 1: feedback records keyed by auto-increment id.
///
/// `created_at` is stored as `YYYY-MM-DD HH:MM:SS` (UTC) so that SQLite's
/// `DATE()` yields calendar dates for the trend aggregate.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS feedback_records (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_text    TEXT NOT NULL,
            sentiment       TEXT
                            CHECK (sentiment IS NULL
                                   OR sentiment IN ('positive', 'negative', 'neutral', 'undefined')),
            customer_name   TEXT,
            email           TEXT,
            unit            TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedback_unit_sentiment
            ON feedback_records (unit, sentiment);

        CREATE INDEX IF NOT EXISTS idx_feedback_created_at
            ON feedback_records (created_at);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'feedback_records');
        ",
    )
    .map_err(|e| SymError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}

/// Version 2: durable copy of the in-memory vector index.
///
/// `vector_values` is a JSON array of floats and `metadata` a JSON object.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS vector_entries (
            namespace       TEXT NOT NULL,
            id              TEXT NOT NULL,
            vector_values   TEXT NOT NULL,
            metadata        TEXT NOT NULL,
            PRIMARY KEY (namespace, id)
        );

        INSERT INTO schema_migrations (version, name) VALUES (2, 'vector_entries');
        ",
    )
    .map_err(|e| SymError::Storage(format!("Migration v2 failed: {}", e)))?;
    Ok(())
}
