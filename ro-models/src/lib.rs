//! ReachOut Models - Data model, validation, schedule arithmetic, and persistence.
//!
//! This crate owns everything that does not need a running service:
//! the persisted record types, schema validation of untrusted JSON, the
//! next-due-date arithmetic, the pure state reducers, and the key-value
//! store (SQLite-backed, with an in-memory variant for tests).

pub mod db;
pub mod schema;
pub mod migrations;
pub mod kv;
pub mod models;
pub mod validation;
pub mod dates;
pub mod state;

// Re-export key types
pub use db::{Database, DbPool};
pub use kv::{KeyValueStore, MemoryStore};
pub use models::contact::{Contact, DeviceContact, Frequency, NewContact, PhoneNumber};
pub use models::settings::{NotificationTime, Settings};
pub use models::backup::BackupRecord;
pub use models::reminder::{MonthlyReminderRecord, RepeatInterval, ReminderPayload, ScheduledReminder};
pub use models::log_entry::{DeviceInfo, LogEntry, LogLevel};
pub use validation::{validate_contact, validate_new_contact, validate_notification_time};
pub use dates::{next_due_date, next_reminder_at, ReachOutStatus, SortOrder};
