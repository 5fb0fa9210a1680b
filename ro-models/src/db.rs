//! Database initialization, connection pooling, and lifecycle management.
//!
//! Uses SQLite (WAL mode by default) with r2d2 connection pooling. The
//! database holds a single key-value table; see [`crate::kv`] for the
//! record-level API the stores use.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{error, info};

use ro_core::config::StorageConfig;
use ro_core::error::{RoError, RoResult};

use crate::schema;
use crate::migrations;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Initialize the database at the given path with the provided configuration.
    ///
    /// Creates parent directories, builds the pool, verifies integrity, then
    /// creates the schema and runs pending migrations.
    pub fn init(db_path: &Path, config: &StorageConfig) -> RoResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("initializing database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| RoError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };
        db.run_integrity_check()?;
        db.prepare_schema()?;

        info!("database initialized successfully");
        Ok(db)
    }

    /// Open a private in-memory database. Every pooled connection to
    /// `:memory:` would be a different database, so the pool holds one.
    pub fn open_in_memory() -> RoResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| RoError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };
        db.prepare_schema()?;
        Ok(db)
    }

    fn prepare_schema(&self) -> RoResult<()> {
        let conn = self.conn()?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&conn)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> RoResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| RoError::Pool(e.to_string()))
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> RoResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| RoError::Database(e.to_string()))?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(RoError::Database(format!("integrity check failed: {result}")));
        }

        Ok(())
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> RoResult<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .map_err(|e| RoError::Database(e.to_string()))
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;",
        )?;

        Ok(())
    }
}
