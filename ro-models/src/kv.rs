//! Key-value record storage.
//!
//! The stores persist whole records (JSON documents or plain strings) under
//! string keys. [`Database`] implements the trait over the `kv_store` table;
//! [`MemoryStore`] keeps everything in a map and can simulate I/O failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;

use ro_core::error::{RoError, RoResult};

use crate::db::Database;

/// Record-level persistence used by every store.
///
/// Read failures map to [`RoError::StorageRead`], write failures to
/// [`RoError::StorageWrite`].
pub trait KeyValueStore: Send + Sync {
    /// Get the raw value for a key.
    fn get(&self, key: &str) -> RoResult<Option<String>>;

    /// Insert or replace the value for a key.
    fn set(&self, key: &str, value: &str) -> RoResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> RoResult<()>;

    /// All keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> RoResult<Vec<String>>;
}

/// JSON helpers available on every [`KeyValueStore`], including trait objects.
pub trait KeyValueStoreExt {
    /// Get and deserialize a JSON record.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> RoResult<Option<T>>;

    /// Serialize and store a JSON record.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> RoResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> RoResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => {
                let parsed = serde_json::from_str(&raw)
                    .map_err(|e| RoError::Serialization(format!("failed to parse {key}: {e}")))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> RoResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

fn read_error(key: &str, e: impl std::fmt::Display) -> RoError {
    RoError::StorageRead {
        key: key.to_string(),
        message: e.to_string(),
    }
}

fn write_error(key: &str, e: impl std::fmt::Display) -> RoError {
    RoError::StorageWrite {
        key: key.to_string(),
        message: e.to_string(),
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> RoResult<Option<String>> {
        let conn = self.conn().map_err(|e| read_error(key, e))?;
        match conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(read_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> RoResult<()> {
        let conn = self.conn().map_err(|e| write_error(key, e))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )
        .map_err(|e| write_error(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RoResult<()> {
        let conn = self.conn().map_err(|e| write_error(key, e))?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(|e| write_error(key, e))?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> RoResult<Vec<String>> {
        let conn = self.conn().map_err(|e| read_error(prefix, e))?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
            .map_err(|e| read_error(prefix, e))?;

        let keys = stmt
            .query_map([prefix], |row| row.get::<_, String>(0))
            .map_err(|e| read_error(prefix, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| read_error(prefix, e))?;

        Ok(keys)
    }
}

/// In-memory key-value store.
///
/// Clones share the same map. Reads and writes can be made to fail on demand
/// to exercise the stores' error paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get`/`keys_with_prefix` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set`/`remove` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> RoResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(read_error(key, "simulated read failure"));
        }
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_error(key, "simulated write failure"));
        }
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_error(key, "simulated write failure"));
        }
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> RoResult<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(read_error(prefix, "simulated read failure"));
        }
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
