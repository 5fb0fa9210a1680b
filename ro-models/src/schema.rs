//! Database schema definitions and table creation.
//!
//! Every persisted record is a JSON (or plain string) value under a string
//! key, mirroring the async key-value storage the mobile app used.

use rusqlite::Connection;
use ro_core::error::{RoError, RoResult};
use tracing::debug;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> RoResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| RoError::Database(format!("failed to create schema: {e}")))?;
    debug!("database schema verified");
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Key-value records (contacts, settings, backups, side records, logs)
CREATE TABLE IF NOT EXISTS kv_store (
    key         TEXT PRIMARY KEY NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#;
