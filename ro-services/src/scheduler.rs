//! Reminder scheduler.
//!
//! Keeps exactly one pending reminder per reminder-enabled contact while
//! global notifications are on. Any change to contacts or settings triggers a
//! full rebuild: cancel everything, then schedule each eligible contact again.
//!
//! Monthly reminders do not repeat natively (month lengths vary), so each one
//! gets a side record `@monthly_notification_<id>` holding its target date.
//! The missed-reminder sweep uses those records to find monthly reminders
//! whose date passed without being re-armed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ro_core::constants::{keys, reminder_text, REMINDER_CHANNEL_ID};
use ro_core::error::{RoError, RoResult};
use ro_models::kv::KeyValueStoreExt;
use ro_models::{
    next_reminder_at, Contact, Frequency, KeyValueStore, MonthlyReminderRecord, NotificationTime,
    ReminderPayload, ScheduledReminder,
};

use crate::activity_log::ActivityLog;
use crate::contact::ContactStore;
use crate::event_bus::{AppEvent, EventBus};
use crate::notification::ReminderPlatform;
use crate::service::{Service, ServiceState};
use crate::settings::SettingsStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingFailure {
    pub contact_id: String,
    pub error: String,
}

/// Result of a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleReport {
    /// Contacts that now have a pending reminder.
    pub scheduled: Vec<String>,
    /// Contacts whose reminder could not be scheduled.
    pub failed: Vec<SchedulingFailure>,
    /// Stale monthly side records removed.
    pub pruned: usize,
}

/// Build the reminder for a contact's next cycle.
pub fn build_reminder<Tz: TimeZone>(
    contact: &Contact,
    time: NotificationTime,
    channel_id: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> ScheduledReminder {
    ScheduledReminder {
        id: contact.id.clone(),
        channel_id: channel_id.to_string(),
        title: reminder_text::TITLE.to_string(),
        message: reminder_text::message(&contact.name),
        big_text: reminder_text::big_text(&contact.name),
        fire_at: next_reminder_at(contact.last_reached_out, contact.frequency, time, now, tz),
        repeat: contact.frequency.repeat_interval(),
        payload: ReminderPayload {
            contact_id: contact.id.clone(),
            notification_time: time,
        },
    }
}

#[derive(Clone)]
pub struct ReminderScheduler {
    state: ServiceState,
    contacts: ContactStore,
    settings: SettingsStore,
    platform: Arc<dyn ReminderPlatform>,
    store: Arc<dyn KeyValueStore>,
    event_bus: EventBus,
    activity: ActivityLog,
    channel_id: String,
    rebuild_lock: Arc<Mutex<()>>,
}

impl ReminderScheduler {
    pub fn new(
        contacts: ContactStore,
        settings: SettingsStore,
        platform: Arc<dyn ReminderPlatform>,
        store: Arc<dyn KeyValueStore>,
        event_bus: EventBus,
        activity: ActivityLog,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            contacts,
            settings,
            platform,
            store,
            event_bus,
            activity,
            channel_id: REMINDER_CHANNEL_ID.to_string(),
            rebuild_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    /// Cancel every reminder and schedule all eligible contacts from scratch.
    pub async fn rebuild_all(&self) -> RoResult<RescheduleReport> {
        self.rebuild_all_at(Utc::now()).await
    }

    pub async fn rebuild_all_at(&self, now: DateTime<Utc>) -> RoResult<RescheduleReport> {
        let _guard = self.rebuild_lock.lock().await;

        self.platform.cancel_all().await?;
        let settings = self.settings.settings().await;
        let mut report = RescheduleReport::default();

        if !settings.global_notifications {
            report.pruned = self.prune_side_records(&HashSet::new());
            info!("global notifications disabled, all reminders cancelled");
            self.emit_rebuilt(&report);
            return Ok(report);
        }

        let mut monthly = HashSet::new();
        for contact in self.contacts.list().await.iter().filter(|c| c.reminder_enabled) {
            match self.schedule_contact(contact, settings.notification_time, now).await {
                Ok(_) => {
                    if contact.frequency == Frequency::Monthly {
                        monthly.insert(contact.id.clone());
                    }
                    report.scheduled.push(contact.id.clone());
                }
                Err(e) => {
                    error!("error scheduling reminder for {}: {e}", contact.id);
                    self.activity
                        .error(
                            "Error scheduling notification",
                            Some(json!({ "contactId": contact.id, "error": e.to_string() })),
                        )
                        .await;
                    report.failed.push(SchedulingFailure {
                        contact_id: contact.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.pruned = self.prune_side_records(&monthly);

        info!(
            "rebuilt reminders: {} scheduled, {} failed",
            report.scheduled.len(),
            report.failed.len()
        );
        self.emit_rebuilt(&report);
        Ok(report)
    }

    fn emit_rebuilt(&self, report: &RescheduleReport) {
        self.event_bus.emit(AppEvent::RemindersRebuilt {
            scheduled: report.scheduled.len(),
            failed: report.failed.len(),
        });
    }

    /// Schedule one contact; monthly contacts also get their side record.
    async fn schedule_contact(
        &self,
        contact: &Contact,
        time: NotificationTime,
        now: DateTime<Utc>,
    ) -> RoResult<DateTime<Utc>> {
        let reminder = build_reminder(contact, time, &self.channel_id, now, &Local);
        let fire_at = reminder.fire_at;
        let scheduling_error = |e: RoError| RoError::Scheduling {
            contact_id: contact.id.clone(),
            message: e.to_string(),
        };

        self.platform.schedule(reminder).await.map_err(scheduling_error)?;

        if contact.frequency == Frequency::Monthly {
            let record = MonthlyReminderRecord {
                scheduled_date: fire_at,
                notification_time: time,
            };
            self.store
                .set_json(&keys::monthly_notification(&contact.id), &record)
                .map_err(scheduling_error)?;
        }

        debug!("scheduled reminder for {} at {fire_at}", contact.id);
        Ok(fire_at)
    }

    /// Remove side records for every contact not in `keep`.
    fn prune_side_records(&self, keep: &HashSet<String>) -> usize {
        let side_keys = match self.store.keys_with_prefix(keys::MONTHLY_NOTIFICATION_PREFIX) {
            Ok(side_keys) => side_keys,
            Err(e) => {
                warn!("failed to list monthly reminder records: {e}");
                return 0;
            }
        };

        let mut pruned = 0;
        for key in side_keys {
            let id = &key[keys::MONTHLY_NOTIFICATION_PREFIX.len()..];
            if keep.contains(id) {
                continue;
            }
            match self.store.remove(&key) {
                Ok(()) => pruned += 1,
                Err(e) => warn!("failed to remove stale record {key}: {e}"),
            }
        }
        if pruned > 0 {
            debug!("pruned {pruned} stale monthly reminder record(s)");
        }
        pruned
    }

    /// Reschedule monthly reminders whose target date has passed.
    /// Returns the contacts that were rescheduled.
    pub async fn check_missed(&self, now: DateTime<Utc>) -> Vec<String> {
        if !self.settings.settings().await.global_notifications {
            return Vec::new();
        }

        let _guard = self.rebuild_lock.lock().await;
        let mut rescheduled = Vec::new();
        let monthly = self
            .contacts
            .list()
            .await
            .into_iter()
            .filter(|c| c.frequency == Frequency::Monthly && c.reminder_enabled);

        for contact in monthly {
            let record = match self
                .store
                .get_json::<MonthlyReminderRecord>(&keys::monthly_notification(&contact.id))
            {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!("unreadable monthly reminder record for {}: {e}", contact.id);
                    continue;
                }
            };
            if !record.is_missed(now) {
                continue;
            }

            match self.schedule_contact(&contact, record.notification_time, now).await {
                Ok(fire_at) => {
                    info!("rescheduled missed reminder for {} to {fire_at}", contact.id);
                    rescheduled.push(contact.id);
                }
                Err(e) => error!("error checking missed notifications: {e}"),
            }
        }

        if !rescheduled.is_empty() {
            self.event_bus.emit(AppEvent::MissedRemindersRescheduled {
                contact_ids: rescheduled.clone(),
            });
        }
        rescheduled
    }

    /// Called after a reminder was shown. Monthly contacts are re-armed for
    /// their next cycle; daily and weekly reminders repeat on their own.
    pub async fn handle_delivered(&self, reminder: &ScheduledReminder, now: DateTime<Utc>) -> RoResult<()> {
        let contact_id = &reminder.payload.contact_id;
        self.event_bus.emit(AppEvent::ReminderDelivered {
            contact_id: contact_id.clone(),
        });
        self.activity
            .info("Reminder delivered", Some(json!({ "contactId": contact_id })))
            .await;

        let Some(contact) = self.contacts.get(contact_id).await else {
            debug!("delivered reminder for unknown contact {contact_id}");
            return Ok(());
        };
        let global = self.settings.settings().await.global_notifications;
        if contact.frequency != Frequency::Monthly || !contact.reminder_enabled || !global {
            return Ok(());
        }

        let _guard = self.rebuild_lock.lock().await;
        self.schedule_contact(&contact, reminder.payload.notification_time, now)
            .await?;
        Ok(())
    }

    /// Rebuild whenever contacts or settings change.
    pub fn start_listener(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        let mut rx = self.event_bus.subscribe();
        tokio::spawn(async move {
            loop {
                let reason = match rx.recv().await {
                    Ok(AppEvent::ContactsChanged { .. }) => "contacts changed",
                    Ok(AppEvent::SettingsChanged { .. }) => "settings changed",
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("reminder scheduler lagged by {n} events");
                        "missed events"
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("reminder scheduler: event channel closed");
                        break;
                    }
                };
                debug!("rebuilding reminders: {reason}");
                if let Err(e) = scheduler.rebuild_all().await {
                    error!("reminder rebuild failed: {e}");
                }
            }
        })
    }
}

impl Service for ReminderScheduler {
    fn name(&self) -> &str { "reminder_scheduler" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> RoResult<()> {
        self.state = ServiceState::Running;
        info!("reminder scheduler initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RoResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
