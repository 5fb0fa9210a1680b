//! Versioned database migrations.
//!
//! Migrations run sequentially from the current stored version to the latest.

use rusqlite::Connection;
use tracing::{debug, info, warn};
use ro_core::error::{RoError, RoResult};
use ro_core::constants::DB_SCHEMA_VERSION;

/// Run all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> RoResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= DB_SCHEMA_VERSION {
        debug!("database schema is up to date (version {current_version})");
        return Ok(());
    }

    info!("running migrations from version {current_version} to {DB_SCHEMA_VERSION}");

    for version in (current_version + 1)..=DB_SCHEMA_VERSION {
        run_migration(conn, version)?;
    }

    set_schema_version(conn, DB_SCHEMA_VERSION)?;
    info!("migrations complete, schema at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> RoResult<i32> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| RoError::Migration(e.to_string()))?;

    if count == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .map_err(|e| RoError::Migration(e.to_string()))?;
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })
    .map_err(|e| RoError::Migration(e.to_string()))
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> RoResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(|e| RoError::Migration(e.to_string()))?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> RoResult<()> {
    debug!("applying migration version {version}");

    match version {
        // Baseline: `schema::create_tables` builds the v1 layout.
        1 => Ok(()),
        _ => {
            warn!("unknown migration version {version}, skipping");
            Ok(())
        }
    }
}
