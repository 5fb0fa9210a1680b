//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "ReachOut";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base name of the rolling log file.
pub const LOG_FILE_NAME: &str = "reachout.log";

/// Default SQLite file name inside the data directory.
pub const DB_FILE_NAME: &str = "reachout.db";

/// Database schema version.
pub const DB_SCHEMA_VERSION: i32 = 1;

/// Maximum number of contact-list snapshots kept in the backup ring.
pub const MAX_BACKUPS: usize = 5;

/// Maximum number of activity log entries kept.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Default time of day reminders fire at.
pub const DEFAULT_NOTIFICATION_TIME: &str = "09:00";

/// Notification channel reminders are posted to.
pub const REMINDER_CHANNEL_ID: &str = "reachout-reminders";

/// Keys of the records in the key-value store.
pub mod keys {
    /// JSON array of contacts.
    pub const CONTACTS: &str = "contacts";
    /// Global notification settings.
    pub const SETTINGS: &str = "settings";
    /// Backup ring of contact-list snapshots.
    pub const BACKUP: &str = "@ReachOut:backup";
    /// Activity log entries.
    pub const ERROR_LOGS: &str = "@ReachOut:errorLogs";
    /// Whether onboarding has been completed.
    pub const ONBOARDING: &str = "@ReachOut:hasCompletedOnboarding";
    /// Pending reminders of the local reminder queue.
    pub const SCHEDULED_REMINDERS: &str = "@ReachOut:scheduledReminders";
    /// Prefix of the per-contact monthly reminder side records.
    pub const MONTHLY_NOTIFICATION_PREFIX: &str = "@monthly_notification_";

    /// Side-record key for a monthly contact.
    pub fn monthly_notification(contact_id: &str) -> String {
        format!("{MONTHLY_NOTIFICATION_PREFIX}{contact_id}")
    }
}

/// Reminder notification text.
pub mod reminder_text {
    pub const TITLE: &str = "Time to Reach Out! \u{1F44B}";

    /// Short body shown in the notification.
    pub fn message(name: &str) -> String {
        format!("It's time to connect with {name}")
    }

    /// Expanded body shown when the notification is opened.
    pub fn big_text(name: &str) -> String {
        format!("It's been a while since you last connected with {name}. Why not reach out today?")
    }
}
