//! Integration tests for the startup sequence and registry wiring.

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::json;

use ro_core::constants::keys;
use ro_models::kv::KeyValueStoreExt;
use ro_models::{BackupRecord, KeyValueStore, MemoryStore, MonthlyReminderRecord, NotificationTime, ScheduledReminder};
use ro_services::{AppEvent, LoadOutcome, ReminderPlatform, ServiceRegistry, ServiceState};

async fn registry_over(kv: &MemoryStore) -> ServiceRegistry {
    ServiceRegistry::new(common::create_test_config_handle(), Arc::new(kv.clone()))
        .await
        .unwrap()
}

#[tokio::test]
async fn fresh_start_is_empty_and_healthy() {
    let kv = MemoryStore::new();
    let mut registry = registry_over(&kv).await;

    let report = registry.start().await.unwrap();
    assert_eq!(report.load, LoadOutcome::Normal);
    assert!(report.missed.is_empty());
    assert!(report.reminders.scheduled.is_empty());
    assert!(!registry.onboarding.is_complete());
    assert!(registry
        .health_check()
        .iter()
        .all(|(_, state, healthy)| *state == ServiceState::Running && *healthy));

    // Default settings were persisted on first load.
    assert!(kv.get(keys::SETTINGS).unwrap().is_some());
    registry.shutdown();
}

#[tokio::test]
async fn start_recovers_contacts_and_schedules_them() {
    let kv = MemoryStore::new();
    let now = Utc::now();
    let data = json!([
        common::contact_json("a", "Ada", "daily", now - Duration::days(1)),
        common::contact_json("b", "Bob", "weekly", now - Duration::days(3))
    ])
    .to_string();
    kv.set_json(keys::BACKUP, &vec![BackupRecord { timestamp: now, data }])
        .unwrap();
    kv.set(keys::CONTACTS, "not json").unwrap();

    let mut registry = registry_over(&kv).await;
    let report = registry.start().await.unwrap();

    assert_eq!(report.load, LoadOutcome::RecoveredFromBackup { timestamp: now });
    assert_eq!(report.reminders.scheduled.len(), 2);
    let pending = registry.reminders.scheduled().await.unwrap();
    let mut ids: Vec<_> = pending.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(pending.iter().all(|r| r.fire_at > now));
    registry.shutdown();
}

#[tokio::test]
async fn start_sweeps_missed_monthly_reminders() {
    let kv = MemoryStore::new();
    let now = Utc::now();
    kv.set(
        keys::CONTACTS,
        &json!([common::contact_json("m", "Mo", "monthly", now - Duration::days(40))]).to_string(),
    )
    .unwrap();
    let missed = MonthlyReminderRecord {
        scheduled_date: now - Duration::days(9),
        notification_time: NotificationTime::new(8, 15).unwrap(),
    };
    kv.set_json(&keys::monthly_notification("m"), &missed).unwrap();

    let mut registry = registry_over(&kv).await;
    let report = registry.start().await.unwrap();

    assert_eq!(report.missed, vec!["m".to_string()]);
    let record: MonthlyReminderRecord = kv
        .get_json(&keys::monthly_notification("m"))
        .unwrap()
        .unwrap();
    assert!(record.scheduled_date > now);
    registry.shutdown();
}

#[tokio::test]
async fn listener_cancels_reminders_when_notifications_disabled() {
    let kv = MemoryStore::new();
    kv.set(
        keys::CONTACTS,
        &json!([common::contact_json("a", "Ada", "weekly", Utc::now())]).to_string(),
    )
    .unwrap();
    let mut registry = registry_over(&kv).await;
    registry.start().await.unwrap();
    assert_eq!(registry.reminders.scheduled().await.unwrap().len(), 1);

    let mut rx = registry.event_bus.subscribe();
    registry.start_listener();
    assert!(registry.is_listening());
    registry.settings.set_notifications_enabled(false).await.unwrap();

    tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            if let Ok(AppEvent::RemindersRebuilt { .. }) = rx.recv().await {
                break;
            }
        }
    })
    .await
    .expect("listener did not rebuild");
    assert!(registry.reminders.scheduled().await.unwrap().is_empty());

    registry.shutdown();
    assert!(!registry.is_listening());
}

/// Pull every persisted reminder's fire time back to `at`, as if the
/// process had been down until after it came due.
fn backdate_queue(kv: &MemoryStore, at: chrono::DateTime<Utc>) {
    let mut queued: Vec<ScheduledReminder> = kv.get_json(keys::SCHEDULED_REMINDERS).unwrap().unwrap();
    for reminder in &mut queued {
        reminder.fire_at = at;
    }
    kv.set_json(keys::SCHEDULED_REMINDERS, &queued).unwrap();
}

#[tokio::test]
async fn reminder_due_between_runs_is_delivered_on_next_start() {
    let kv = MemoryStore::new();
    kv.set(
        keys::CONTACTS,
        &json!([common::contact_json("a", "Ada", "weekly", Utc::now() - Duration::days(2))]).to_string(),
    )
    .unwrap();

    let mut first = registry_over(&kv).await;
    let report = first.start().await.unwrap();
    assert!(report.delivered.is_empty());
    first.shutdown();

    let now = Utc::now();
    backdate_queue(&kv, now - Duration::minutes(1));

    let mut second = registry_over(&kv).await;
    let report = second.start().await.unwrap();
    assert_eq!(report.delivered.len(), 1);
    assert_eq!(report.delivered[0].payload.contact_id, "a");

    // Rebuilt for the next cycle, and nothing is delivered twice.
    let pending = second.reminders.scheduled().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].fire_at > now);
    assert!(second.deliver_due(Utc::now()).await.unwrap().is_empty());
    second.shutdown();
}

#[tokio::test]
async fn due_monthly_reminder_is_rearmed_on_next_start() {
    let kv = MemoryStore::new();
    let now = Utc::now();
    kv.set(
        keys::CONTACTS,
        &json!([common::contact_json("m", "Mo", "monthly", now - Duration::days(20))]).to_string(),
    )
    .unwrap();
    let mut first = registry_over(&kv).await;
    first.start().await.unwrap();
    first.shutdown();

    backdate_queue(&kv, now - Duration::minutes(5));

    let mut second = registry_over(&kv).await;
    let report = second.start().await.unwrap();
    assert_eq!(report.delivered.len(), 1);
    assert!(report.missed.is_empty());

    let pending = second.reminders.scheduled().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].fire_at > now);
    let record: MonthlyReminderRecord = kv
        .get_json(&keys::monthly_notification("m"))
        .unwrap()
        .unwrap();
    assert!(record.scheduled_date > now);
    second.shutdown();
}

#[tokio::test]
async fn deliver_due_reads_the_injected_platform() {
    let kv = MemoryStore::new();
    kv.set(
        keys::CONTACTS,
        &json!([common::contact_json("a", "Ada", "daily", Utc::now())]).to_string(),
    )
    .unwrap();
    let platform = Arc::new(common::RecordingPlatform::default());
    let mut registry = ServiceRegistry::with_platform(
        common::create_test_config_handle(),
        Arc::new(kv.clone()),
        platform.clone(),
    )
    .await
    .unwrap();
    registry.start().await.unwrap();
    assert_eq!(platform.pending_ids(), vec!["a".to_string()]);
    assert_eq!(registry.reminders.scheduled().await.unwrap().len(), 1);

    let fire_at = platform.get("a").unwrap().fire_at;
    let delivered = registry.deliver_due(fire_at + Duration::minutes(1)).await.unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(platform.get("a").unwrap().fire_at > fire_at);
    registry.shutdown();
}
