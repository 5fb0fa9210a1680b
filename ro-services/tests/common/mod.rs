//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use ro_core::config::{AppConfig, ConfigHandle, StorageConfig};
use ro_core::error::{RoError, RoResult};
use ro_models::{Database, Frequency, KeyValueStore, MemoryStore, NewContact, ScheduledReminder};
use ro_services::{
    ActivityLog, ContactStore, EventBus, ReminderPlatform, ReminderScheduler, SettingsStore,
};

/// Create a temporary on-disk database with schema and migrations applied.
/// The TempDir must be held alive for the duration of the test.
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("reachout.db");
    let db = Database::init(&path, &StorageConfig::default()).expect("failed to init test database");
    (db, dir)
}

/// Default configuration with desktop notifications switched off.
pub fn create_test_config_handle() -> ConfigHandle {
    let mut config = AppConfig::default();
    config.notifications.desktop = false;
    ConfigHandle::new(config)
}

/// Create an EventBus with a small buffer suitable for tests.
pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

/// Fields of a contact last reached `days_ago` days before now.
pub fn new_contact(name: &str, frequency: Frequency, days_ago: i64) -> NewContact {
    let mut new = NewContact::new(name, frequency);
    new.last_reached_out = Utc::now() - Duration::days(days_ago);
    new
}

/// A stored contact record as raw JSON.
pub fn contact_json(id: &str, name: &str, frequency: &str, last: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "name": name,
        "frequency": frequency,
        "lastReachedOut": last.to_rfc3339(),
        "reminderEnabled": true
    })
}

/// Reminder platform that records what is scheduled and can refuse
/// specific contacts.
#[derive(Default)]
pub struct RecordingPlatform {
    pending: Mutex<BTreeMap<String, ScheduledReminder>>,
    failing: Mutex<HashSet<String>>,
    cancel_all_calls: AtomicUsize,
}

impl RecordingPlatform {
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<ScheduledReminder> {
        self.pending.lock().unwrap().get(id).cloned()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.cancel_all_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReminderPlatform for RecordingPlatform {
    async fn schedule(&self, reminder: ScheduledReminder) -> RoResult<()> {
        if self.failing.lock().unwrap().contains(&reminder.id) {
            return Err(RoError::Notification("platform refused".into()));
        }
        self.pending.lock().unwrap().insert(reminder.id.clone(), reminder);
        Ok(())
    }

    async fn cancel(&self, id: &str) -> RoResult<()> {
        self.pending.lock().unwrap().remove(id);
        Ok(())
    }

    async fn cancel_all(&self) -> RoResult<()> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().clear();
        Ok(())
    }

    async fn scheduled(&self) -> RoResult<Vec<ScheduledReminder>> {
        Ok(self.pending.lock().unwrap().values().cloned().collect())
    }

    async fn deliver_due(&self, now: DateTime<Utc>) -> RoResult<Vec<ScheduledReminder>> {
        let mut pending = self.pending.lock().unwrap();
        let mut due = Vec::new();
        pending.retain(|_, reminder| {
            if !reminder.is_due(now) {
                return true;
            }
            due.push(reminder.clone());
            reminder.rearm_after(now)
        });
        Ok(due)
    }
}

/// Stores and scheduler wired over one in-memory store.
pub struct TestServices {
    pub kv: MemoryStore,
    pub bus: EventBus,
    pub activity: ActivityLog,
    pub contacts: ContactStore,
    pub settings: SettingsStore,
    pub platform: Arc<RecordingPlatform>,
    pub scheduler: ReminderScheduler,
}

/// Build services over `kv` without loading anything.
pub fn build_services(kv: MemoryStore) -> TestServices {
    let shared: Arc<dyn KeyValueStore> = Arc::new(kv.clone());
    let bus = create_test_event_bus();
    let activity = ActivityLog::new(shared.clone());
    let contacts = ContactStore::new(shared.clone(), bus.clone(), activity.clone());
    let settings = SettingsStore::new(shared.clone(), bus.clone(), activity.clone());
    let platform = Arc::new(RecordingPlatform::default());
    let scheduler = ReminderScheduler::new(
        contacts.clone(),
        settings.clone(),
        platform.clone(),
        shared,
        bus.clone(),
        activity.clone(),
    );
    TestServices {
        kv,
        bus,
        activity,
        contacts,
        settings,
        platform,
        scheduler,
    }
}

/// Services over a fresh store with settings and contacts loaded.
pub async fn create_test_services() -> TestServices {
    let services = build_services(MemoryStore::new());
    services.settings.load().await;
    services.contacts.load().await;
    services
}
