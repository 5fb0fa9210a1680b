//! Integration tests for reminder scheduling.

mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use ro_core::constants::keys;
use ro_models::kv::KeyValueStoreExt;
use ro_models::{Frequency, KeyValueStore, MonthlyReminderRecord, NotificationTime, RepeatInterval};
use ro_services::AppEvent;

#[tokio::test]
async fn rebuild_schedules_one_reminder_per_enabled_contact() {
    let services = common::create_test_services().await;
    let ada = services
        .contacts
        .add(common::new_contact("Ada", Frequency::Daily, 3))
        .await
        .unwrap();
    let bob = services
        .contacts
        .add(common::new_contact("Bob", Frequency::Weekly, 1))
        .await
        .unwrap();
    let mut quiet = common::new_contact("Quiet", Frequency::Weekly, 1);
    quiet.reminder_enabled = false;
    services.contacts.add(quiet).await.unwrap();

    let now = Utc::now();
    let report = services.scheduler.rebuild_all_at(now).await.unwrap();
    assert_eq!(report.scheduled.len(), 2);
    assert!(report.failed.is_empty());

    let mut expected = vec![ada.id.clone(), bob.id.clone()];
    expected.sort();
    assert_eq!(services.platform.pending_ids(), expected);

    let daily = services.platform.get(&ada.id).unwrap();
    assert_eq!(daily.repeat, Some(RepeatInterval::Day));
    assert!(daily.fire_at > now);
    assert_eq!(daily.message, "It's time to connect with Ada");

    // A second rebuild replaces rather than duplicates.
    services.scheduler.rebuild_all_at(now).await.unwrap();
    assert_eq!(services.platform.pending_ids().len(), 2);
    assert_eq!(services.platform.cancel_all_calls(), 2);
}

#[tokio::test]
async fn monthly_contact_gets_side_record() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 45))
        .await
        .unwrap();

    let now = Utc::now();
    services.scheduler.rebuild_all_at(now).await.unwrap();

    let reminder = services.platform.get(&mo.id).unwrap();
    assert_eq!(reminder.repeat, None);
    let record: MonthlyReminderRecord = services
        .kv
        .get_json(&keys::monthly_notification(&mo.id))
        .unwrap()
        .unwrap();
    assert_eq!(record.scheduled_date, reminder.fire_at);
    assert_eq!(record.notification_time, NotificationTime::default());
    assert!(record.scheduled_date > now);
}

#[tokio::test]
async fn disabling_global_notifications_cancels_everything() {
    let services = common::create_test_services().await;
    services
        .contacts
        .add(common::new_contact("Ada", Frequency::Daily, 0))
        .await
        .unwrap();
    services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 0))
        .await
        .unwrap();
    services.scheduler.rebuild_all().await.unwrap();
    assert_eq!(services.platform.pending_ids().len(), 2);

    services.settings.set_notifications_enabled(false).await.unwrap();
    let report = services.scheduler.rebuild_all().await.unwrap();
    assert!(report.scheduled.is_empty());
    assert_eq!(report.pruned, 1);
    assert!(services.platform.pending_ids().is_empty());
    assert!(services
        .kv
        .keys_with_prefix(keys::MONTHLY_NOTIFICATION_PREFIX)
        .unwrap()
        .is_empty());

    services.settings.set_notifications_enabled(true).await.unwrap();
    services.scheduler.rebuild_all().await.unwrap();
    assert_eq!(services.platform.pending_ids().len(), 2);
}

#[tokio::test]
async fn notification_time_change_applies_to_all_reminders() {
    let services = common::create_test_services().await;
    let ada = services
        .contacts
        .add(common::new_contact("Ada", Frequency::Weekly, 2))
        .await
        .unwrap();

    services.settings.set_notification_time("18:45").await.unwrap();
    services.scheduler.rebuild_all().await.unwrap();

    let reminder = services.platform.get(&ada.id).unwrap();
    assert_eq!(reminder.payload.notification_time.to_string(), "18:45");
}

#[tokio::test]
async fn one_failing_contact_does_not_block_others() {
    let services = common::create_test_services().await;
    let ada = services
        .contacts
        .add(common::new_contact("Ada", Frequency::Daily, 0))
        .await
        .unwrap();
    let bob = services
        .contacts
        .add(common::new_contact("Bob", Frequency::Weekly, 0))
        .await
        .unwrap();
    services.platform.fail_for(&ada.id);

    let report = services.scheduler.rebuild_all().await.unwrap();
    assert_eq!(report.scheduled, vec![bob.id.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].contact_id, ada.id);
    assert_eq!(services.platform.pending_ids(), vec![bob.id]);

    let logged = services.activity.entries().await;
    assert!(logged.iter().any(|e| e.message == "Error scheduling notification"));
}

#[tokio::test]
async fn rebuild_prunes_stale_side_records() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 0))
        .await
        .unwrap();
    let stale = MonthlyReminderRecord {
        scheduled_date: Utc::now(),
        notification_time: NotificationTime::default(),
    };
    services
        .kv
        .set_json(&keys::monthly_notification("deleted-contact"), &stale)
        .unwrap();

    let report = services.scheduler.rebuild_all().await.unwrap();
    assert_eq!(report.pruned, 1);
    assert_eq!(
        services.kv.keys_with_prefix(keys::MONTHLY_NOTIFICATION_PREFIX).unwrap(),
        vec![keys::monthly_notification(&mo.id)]
    );
}

#[tokio::test]
async fn check_missed_reschedules_past_monthly_reminders() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 70))
        .await
        .unwrap();
    let fresh = services
        .contacts
        .add(common::new_contact("Fresh", Frequency::Monthly, 0))
        .await
        .unwrap();
    services.scheduler.rebuild_all().await.unwrap();

    let now = Utc::now();
    let time = NotificationTime::new(7, 30).unwrap();
    let missed = MonthlyReminderRecord {
        scheduled_date: now - Duration::days(2),
        notification_time: time,
    };
    services
        .kv
        .set_json(&keys::monthly_notification(&mo.id), &missed)
        .unwrap();
    let mut rx = services.bus.subscribe();

    let rescheduled = services.scheduler.check_missed(now).await;
    assert_eq!(rescheduled, vec![mo.id.clone()]);
    assert_eq!(
        rx.recv().await.unwrap(),
        AppEvent::MissedRemindersRescheduled { contact_ids: vec![mo.id.clone()] }
    );

    let record: MonthlyReminderRecord = services
        .kv
        .get_json(&keys::monthly_notification(&mo.id))
        .unwrap()
        .unwrap();
    assert!(record.scheduled_date > now);
    assert_eq!(record.notification_time, time);
    assert_eq!(services.platform.get(&mo.id).unwrap().payload.notification_time, time);
    assert!(services.platform.get(&fresh.id).is_some());
}

#[tokio::test]
async fn check_missed_is_skipped_when_notifications_are_off() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 70))
        .await
        .unwrap();
    let missed = MonthlyReminderRecord {
        scheduled_date: Utc::now() - Duration::days(2),
        notification_time: NotificationTime::default(),
    };
    services
        .kv
        .set_json(&keys::monthly_notification(&mo.id), &missed)
        .unwrap();
    services.settings.set_notifications_enabled(false).await.unwrap();

    assert!(services.scheduler.check_missed(Utc::now()).await.is_empty());
    assert!(services.platform.pending_ids().is_empty());
}

#[tokio::test]
async fn delivered_monthly_reminder_is_rearmed() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 31))
        .await
        .unwrap();
    services.scheduler.rebuild_all().await.unwrap();
    let delivered = services.platform.get(&mo.id).unwrap();

    let later = delivered.fire_at + Duration::minutes(1);
    services.scheduler.handle_delivered(&delivered, later).await.unwrap();

    let rearmed = services.platform.get(&mo.id).unwrap();
    assert!(rearmed.fire_at > later);
    let logged = services.activity.entries().await;
    assert!(logged.iter().any(|e| e.message == "Reminder delivered"));
}

#[tokio::test]
async fn delivered_reminder_for_deleted_contact_is_ignored() {
    let services = common::create_test_services().await;
    let mo = services
        .contacts
        .add(common::new_contact("Mo", Frequency::Monthly, 31))
        .await
        .unwrap();
    services.scheduler.rebuild_all().await.unwrap();
    let delivered = services.platform.get(&mo.id).unwrap();
    services.contacts.delete(&mo.id).await.unwrap();
    services.scheduler.rebuild_all().await.unwrap();

    services
        .scheduler
        .handle_delivered(&delivered, Utc::now())
        .await
        .unwrap();
    assert!(services.platform.pending_ids().is_empty());
}

#[tokio::test]
async fn listener_rebuilds_after_contact_change() {
    let services = common::create_test_services().await;
    let mut rx = services.bus.subscribe();
    let listener = services.scheduler.start_listener();

    let ada = services
        .contacts
        .add(common::new_contact("Ada", Frequency::Weekly, 0))
        .await
        .unwrap();

    let rebuilt = tokio::time::timeout(StdDuration::from_secs(5), async {
        loop {
            if let Ok(AppEvent::RemindersRebuilt { scheduled, .. }) = rx.recv().await {
                return scheduled;
            }
        }
    })
    .await
    .expect("listener did not rebuild");
    assert_eq!(rebuilt, 1);
    assert_eq!(services.platform.pending_ids(), vec![ada.id]);

    listener.abort();
}
