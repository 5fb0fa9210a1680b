//! Typed event bus for intra-service communication.
//!
//! Stores announce committed changes here; the reminder scheduler listens and
//! rebuilds. Backed by a tokio broadcast channel so any number of subscribers
//! receive every event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

/// Application-level events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The contact list was committed to storage.
    ContactsChanged {
        count: usize,
    },
    /// The primary contact record was unusable and a backup was restored.
    ContactsRecovered {
        backup_timestamp: DateTime<Utc>,
        count: usize,
    },
    /// The primary contact record was unusable and no backup was valid.
    ContactsReset,
    /// The settings record was committed to storage.
    SettingsChanged {
        global_notifications: bool,
        notification_time: String,
    },
    /// All reminders were cancelled and recomputed.
    RemindersRebuilt {
        scheduled: usize,
        failed: usize,
    },
    /// Monthly reminders whose date passed were scheduled again.
    MissedRemindersRescheduled {
        contact_ids: Vec<String>,
    },
    /// A reminder was shown to the user.
    ReminderDelivered {
        contact_id: String,
    },
}

/// Application-wide event bus.
///
/// Slow subscribers that fall behind receive a `Lagged` error and miss
/// events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => {
                debug!("event_bus: emitted {label} to {count} subscriber(s)");
            }
            Err(_) => {
                debug!("event_bus: no subscribers for {label}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Human-readable label for an event (for logging).
fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::ContactsChanged { .. } => "ContactsChanged",
        AppEvent::ContactsRecovered { .. } => "ContactsRecovered",
        AppEvent::ContactsReset => "ContactsReset",
        AppEvent::SettingsChanged { .. } => "SettingsChanged",
        AppEvent::RemindersRebuilt { .. } => "RemindersRebuilt",
        AppEvent::MissedRemindersRescheduled { .. } => "MissedRemindersRescheduled",
        AppEvent::ReminderDelivered { .. } => "ReminderDelivered",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(AppEvent::ContactsChanged { count: 3 });

        assert_eq!(rx.recv().await.unwrap(), AppEvent::ContactsChanged { count: 3 });
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(AppEvent::ReminderDelivered { contact_id: "c1".into() });

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                AppEvent::ReminderDelivered { contact_id } => assert_eq!(contact_id, "c1"),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(AppEvent::ContactsReset);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_labels() {
        assert_eq!(event_label(&AppEvent::ContactsReset), "ContactsReset");
        assert_eq!(
            event_label(&AppEvent::SettingsChanged {
                global_notifications: true,
                notification_time: "09:00".into(),
            }),
            "SettingsChanged"
        );
    }
}
