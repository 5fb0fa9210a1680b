//! Persisted activity log.
//!
//! Entries are kept newest-first under `@ReachOut:errorLogs`, capped at
//! `MAX_LOG_ENTRIES`, and mirrored to `tracing`. Logging never fails the
//! caller: storage problems are reported through `tracing` only.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use ro_core::constants::{keys, MAX_LOG_ENTRIES};
use ro_core::error::RoResult;
use ro_models::kv::KeyValueStoreExt;
use ro_models::{DeviceInfo, KeyValueStore, LogEntry, LogLevel};

use crate::service::{Service, ServiceState};

#[derive(Clone)]
pub struct ActivityLog {
    state: ServiceState,
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
    device_info: DeviceInfo,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            write_lock: Arc::new(Mutex::new(())),
            device_info: DeviceInfo::current(),
        }
    }

    /// Record an entry.
    pub async fn add(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<Value>,
        stack_trace: Option<String>,
    ) {
        let message = message.into();
        let ctx = context.as_ref().map(Value::to_string).unwrap_or_default();
        match level {
            LogLevel::Info => info!(target: "activity", context = %ctx, "{message}"),
            LogLevel::Warn => warn!(target: "activity", context = %ctx, "{message}"),
            LogLevel::Error => error!(target: "activity", context = %ctx, "{message}"),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message,
            context,
            stack_trace,
            device_info: self.device_info.clone(),
        };

        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries();
        entries.insert(0, entry);
        entries.truncate(MAX_LOG_ENTRIES);
        if let Err(e) = self.store.set_json(keys::ERROR_LOGS, &entries) {
            error!("failed to store activity log: {e}");
        }
    }

    pub async fn info(&self, message: impl Into<String>, context: Option<Value>) {
        self.add(LogLevel::Info, message, context, None).await;
    }

    pub async fn warn(&self, message: impl Into<String>, context: Option<Value>) {
        self.add(LogLevel::Warn, message, context, None).await;
    }

    pub async fn error(&self, message: impl Into<String>, context: Option<Value>) {
        self.add(LogLevel::Error, message, context, None).await;
    }

    /// All entries, newest first. Unreadable logs yield an empty list.
    pub async fn entries(&self) -> Vec<LogEntry> {
        let _guard = self.write_lock.lock().await;
        self.read_entries()
    }

    pub async fn clear(&self) -> RoResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::ERROR_LOGS)?;
        info!("activity log cleared");
        Ok(())
    }

    /// Entries as pretty-printed JSON.
    pub async fn export(&self) -> RoResult<String> {
        let entries = self.entries().await;
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    fn read_entries(&self) -> Vec<LogEntry> {
        match self.store.get_json::<Vec<LogEntry>>(keys::ERROR_LOGS) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                error!("failed to retrieve activity log: {e}");
                Vec::new()
            }
        }
    }
}

impl Service for ActivityLog {
    fn name(&self) -> &str { "activity_log" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> RoResult<()> {
        self.state = ServiceState::Running;
        info!("activity log initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RoResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ro_models::MemoryStore;
    use serde_json::json;

    fn make_log() -> (ActivityLog, MemoryStore) {
        let store = MemoryStore::new();
        (ActivityLog::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_entries_newest_first() {
        let (log, _) = make_log();
        log.info("first", None).await;
        log.error("second", Some(json!({"contactId": "c1"}))).await;

        let entries = log.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "second");
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].context, Some(json!({"contactId": "c1"})));
        assert_eq!(entries[1].message, "first");
    }

    #[tokio::test]
    async fn test_capped_at_max_entries() {
        let (log, store) = make_log();
        let filler: Vec<LogEntry> = (0..MAX_LOG_ENTRIES)
            .map(|i| LogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Info,
                message: format!("old {i}"),
                context: None,
                stack_trace: None,
                device_info: DeviceInfo::current(),
            })
            .collect();
        store.set_json(keys::ERROR_LOGS, &filler).unwrap();

        log.warn("newest", None).await;

        let entries = log.entries().await;
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        assert_eq!(entries[0].message, "newest");
        assert_eq!(entries[MAX_LOG_ENTRIES - 1].message, format!("old {}", MAX_LOG_ENTRIES - 2));
    }

    #[tokio::test]
    async fn test_write_failure_does_not_panic() {
        let (log, store) = make_log();
        store.set_fail_writes(true);
        log.error("lost", None).await;
        store.set_fail_writes(false);
        assert!(log.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_export() {
        let (log, _) = make_log();
        log.info("kept", None).await;

        let exported = log.export().await.unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(exported.contains('\n'));

        log.clear().await.unwrap();
        assert!(log.entries().await.is_empty());
        assert_eq!(log.export().await.unwrap(), "[]");
    }
}
