//! Scheduled reminder and monthly side-record models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::settings::NotificationTime;

/// Native repeat interval of a scheduled reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatInterval {
    Day,
    Week,
}

impl RepeatInterval {
    pub fn duration(&self) -> Duration {
        match self {
            RepeatInterval::Day => Duration::days(1),
            RepeatInterval::Week => Duration::weeks(1),
        }
    }
}

/// Data attached to a reminder, handed back when it is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub contact_id: String,
    pub notification_time: NotificationTime,
}

/// A local notification scheduled for one contact. Its id is the contact id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReminder {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub message: String,
    pub big_text: String,
    pub fire_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatInterval>,
    pub payload: ReminderPayload,
}

impl ScheduledReminder {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }

    /// Move a repeating reminder forward by whole intervals until it is after `now`.
    /// Returns `false` for one-shot reminders, which are left untouched.
    pub fn rearm_after(&mut self, now: DateTime<Utc>) -> bool {
        let Some(repeat) = self.repeat else {
            return false;
        };
        let step = repeat.duration();
        if self.fire_at <= now {
            let behind = now - self.fire_at;
            let steps = behind.num_seconds() / step.num_seconds() + 1;
            self.fire_at += step * steps as i32;
        }
        true
    }
}

/// Side record persisted per monthly contact under `@monthly_notification_<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReminderRecord {
    pub scheduled_date: DateTime<Utc>,
    pub notification_time: NotificationTime,
}

impl MonthlyReminderRecord {
    /// The target date passed without the reminder being re-armed.
    pub fn is_missed(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_date <= now
    }
}
