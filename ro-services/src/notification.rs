//! Reminder platform abstraction and the local reminder queue.
//!
//! The scheduler talks to a `ReminderPlatform`. On the desktop that is
//! `LocalReminderQueue`: pending reminders are kept in the key-value store and
//! shown as native notifications once their fire time has passed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ro_core::constants::{keys, APP_NAME};
use ro_core::error::{RoError, RoResult};
use ro_models::kv::KeyValueStoreExt;
use ro_models::{KeyValueStore, ScheduledReminder};

/// Where scheduled reminders live until they fire.
#[async_trait]
pub trait ReminderPlatform: Send + Sync {
    /// Schedule a reminder, replacing any pending one with the same id.
    async fn schedule(&self, reminder: ScheduledReminder) -> RoResult<()>;

    /// Cancel the pending reminder with this id, if any.
    async fn cancel(&self, id: &str) -> RoResult<()>;

    /// Cancel every pending reminder.
    async fn cancel_all(&self) -> RoResult<()>;

    /// Pending reminders, earliest first.
    async fn scheduled(&self) -> RoResult<Vec<ScheduledReminder>>;

    /// Remove the reminders due at `now` and present them. Repeating
    /// reminders stay queued, re-armed past `now`.
    async fn deliver_due(&self, now: DateTime<Utc>) -> RoResult<Vec<ScheduledReminder>>;
}

/// Persisted reminder queue delivered as desktop notifications.
#[derive(Clone)]
pub struct LocalReminderQueue {
    store: Arc<dyn KeyValueStore>,
    lock: Arc<Mutex<()>>,
    app_name: String,
    desktop: bool,
}

impl LocalReminderQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
            app_name: APP_NAME.to_string(),
            desktop: true,
        }
    }

    /// Application name shown on notifications.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// When off, due reminders are only logged.
    pub fn with_desktop(mut self, desktop: bool) -> Self {
        self.desktop = desktop;
        self
    }

    fn read(&self) -> RoResult<Vec<ScheduledReminder>> {
        Ok(self
            .store
            .get_json(keys::SCHEDULED_REMINDERS)?
            .unwrap_or_default())
    }

    fn write(&self, mut reminders: Vec<ScheduledReminder>) -> RoResult<()> {
        reminders.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        self.store.set_json(keys::SCHEDULED_REMINDERS, &reminders)
    }

    /// Remove and return reminders due at `now`. Repeating reminders are
    /// re-armed past `now` and stay queued; one-shot reminders are dropped.
    /// Returned reminders keep the fire time they were due at.
    pub async fn take_due(&self, now: DateTime<Utc>) -> RoResult<Vec<ScheduledReminder>> {
        let _guard = self.lock.lock().await;
        let pending = self.read()?;

        let mut due = Vec::new();
        let mut keep = Vec::with_capacity(pending.len());
        for mut reminder in pending {
            if !reminder.is_due(now) {
                keep.push(reminder);
                continue;
            }
            due.push(reminder.clone());
            if reminder.rearm_after(now) {
                keep.push(reminder);
            }
        }

        if !due.is_empty() {
            self.write(keep)?;
            debug!("{} reminder(s) due", due.len());
        }
        Ok(due)
    }

    fn show(&self, reminder: &ScheduledReminder) -> RoResult<()> {
        if !self.desktop {
            info!("reminder due: {}", reminder.message);
            return Ok(());
        }
        notify_rust::Notification::new()
            .summary(&reminder.title)
            .body(&reminder.big_text)
            .appname(&self.app_name)
            .show()
            .map_err(|e| RoError::Notification(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ReminderPlatform for LocalReminderQueue {
    async fn schedule(&self, reminder: ScheduledReminder) -> RoResult<()> {
        let _guard = self.lock.lock().await;
        let mut pending = self.read()?;
        pending.retain(|r| r.id != reminder.id);
        debug!("scheduling reminder {} at {}", reminder.id, reminder.fire_at);
        pending.push(reminder);
        self.write(pending)
    }

    async fn cancel(&self, id: &str) -> RoResult<()> {
        let _guard = self.lock.lock().await;
        let mut pending = self.read()?;
        let before = pending.len();
        pending.retain(|r| r.id != id);
        if pending.len() != before {
            self.write(pending)?;
        }
        Ok(())
    }

    async fn cancel_all(&self) -> RoResult<()> {
        let _guard = self.lock.lock().await;
        self.store.remove(keys::SCHEDULED_REMINDERS)
    }

    async fn scheduled(&self) -> RoResult<Vec<ScheduledReminder>> {
        let _guard = self.lock.lock().await;
        self.read()
    }

    /// A notification that cannot be shown is logged and skipped.
    async fn deliver_due(&self, now: DateTime<Utc>) -> RoResult<Vec<ScheduledReminder>> {
        let due = self.take_due(now).await?;
        for reminder in &due {
            match self.show(reminder) {
                Ok(()) => info!("delivered reminder for {}", reminder.payload.contact_id),
                Err(e) => warn!("failed to show reminder {}: {e}", reminder.id),
            }
        }
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ro_models::{MemoryStore, NotificationTime, RepeatInterval, ReminderPayload};

    fn reminder(id: &str, fire_at: DateTime<Utc>, repeat: Option<RepeatInterval>) -> ScheduledReminder {
        ScheduledReminder {
            id: id.into(),
            channel_id: "reachout-reminders".into(),
            title: "Time to Reach Out!".into(),
            message: format!("It's time to connect with {id}"),
            big_text: String::new(),
            fire_at,
            repeat,
            payload: ReminderPayload {
                contact_id: id.into(),
                notification_time: NotificationTime::default(),
            },
        }
    }

    fn queue() -> LocalReminderQueue {
        LocalReminderQueue::new(Arc::new(MemoryStore::new())).with_desktop(false)
    }

    #[tokio::test]
    async fn test_schedule_replaces_same_id() {
        let q = queue();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        q.schedule(reminder("a", t, None)).await.unwrap();
        q.schedule(reminder("a", t + Duration::days(1), None)).await.unwrap();
        q.schedule(reminder("b", t, None)).await.unwrap();

        let pending = q.scheduled().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "b");
        assert_eq!(pending[1].fire_at, t + Duration::days(1));
    }

    #[tokio::test]
    async fn test_cancel_and_cancel_all() {
        let q = queue();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        q.schedule(reminder("a", t, None)).await.unwrap();
        q.schedule(reminder("b", t, None)).await.unwrap();

        q.cancel("a").await.unwrap();
        q.cancel("missing").await.unwrap();
        assert_eq!(q.scheduled().await.unwrap().len(), 1);

        q.cancel_all().await.unwrap();
        assert!(q.scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_due_rearms_repeating_and_drops_one_shot() {
        let q = queue();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        q.schedule(reminder("daily", t, Some(RepeatInterval::Day))).await.unwrap();
        q.schedule(reminder("monthly", t, None)).await.unwrap();
        q.schedule(reminder("later", t + Duration::days(30), None)).await.unwrap();

        let now = t + Duration::hours(1);
        let due = q.deliver_due(now).await.unwrap();
        let ids: Vec<_> = due.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["daily", "monthly"]);
        assert_eq!(due[0].fire_at, t);

        let pending = q.scheduled().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "daily");
        assert_eq!(pending[0].fire_at, t + Duration::days(1));
        assert_eq!(pending[1].id, "later");

        assert!(q.take_due(now).await.unwrap().is_empty());
    }
}
