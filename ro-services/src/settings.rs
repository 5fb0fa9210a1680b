//! Settings store for the global reminder settings.
//!
//! The whole `settings` record is written on every change. The in-memory
//! copy only moves after the write succeeds.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ro_core::constants::keys;
use ro_core::error::RoResult;
use ro_models::kv::KeyValueStoreExt;
use ro_models::state::{reduce_settings, SettingsAction, SettingsState};
use ro_models::{validate_notification_time, KeyValueStore, NotificationTime, Settings};

use crate::activity_log::ActivityLog;
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

#[derive(Clone)]
pub struct SettingsStore {
    state: ServiceState,
    store: Arc<dyn KeyValueStore>,
    event_bus: EventBus,
    activity: ActivityLog,
    defaults: Settings,
    snapshot: Arc<Mutex<SettingsState>>,
}

fn apply(snapshot: &mut SettingsState, action: SettingsAction) {
    *snapshot = reduce_settings(std::mem::take(snapshot), action);
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>, event_bus: EventBus, activity: ActivityLog) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            event_bus,
            activity,
            defaults: Settings::default(),
            snapshot: Arc::new(Mutex::new(SettingsState {
                loading: true,
                ..Default::default()
            })),
        }
    }

    /// Time of day used when no settings record exists yet.
    pub fn with_default_time(mut self, time: NotificationTime) -> Self {
        self.defaults.notification_time = time;
        self
    }

    /// Load the persisted record. A missing record is created from defaults;
    /// an unreadable one falls back to defaults and records an error.
    pub async fn load(&self) -> Settings {
        let mut snapshot = self.snapshot.lock().await;
        apply(&mut snapshot, SettingsAction::SetLoading(true));

        let settings = match self.store.get_json::<Settings>(keys::SETTINGS) {
            Ok(Some(settings)) => {
                debug!("loaded settings");
                settings
            }
            Ok(None) => {
                let settings = self.defaults.clone();
                if let Err(e) = self.store.set_json(keys::SETTINGS, &settings) {
                    warn!("failed to persist default settings: {e}");
                }
                info!("created default settings");
                settings
            }
            Err(e) => {
                warn!("failed to load settings: {e}");
                self.activity
                    .error("Failed to load settings", Some(serde_json::json!({ "error": e.to_string() })))
                    .await;
                apply(&mut snapshot, SettingsAction::SetSettings(self.defaults.clone()));
                apply(&mut snapshot, SettingsAction::SetError("Failed to load settings".into()));
                return self.defaults.clone();
            }
        };

        apply(&mut snapshot, SettingsAction::SetSettings(settings.clone()));
        settings
    }

    pub async fn settings(&self) -> Settings {
        self.snapshot.lock().await.settings.clone()
    }

    pub async fn state(&self) -> SettingsState {
        self.snapshot.lock().await.clone()
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> RoResult<Settings> {
        let mut snapshot = self.snapshot.lock().await;
        let mut next = snapshot.settings.clone();
        next.global_notifications = enabled;
        self.commit(&mut snapshot, next, "Failed to update notifications setting")
    }

    /// Set the reminder time of day from a 24-hour `HH:mm` string.
    pub async fn set_notification_time(&self, raw: &str) -> RoResult<Settings> {
        let mut snapshot = self.snapshot.lock().await;
        let time = match validate_notification_time(raw) {
            Ok(time) => time,
            Err(e) => {
                apply(&mut snapshot, SettingsAction::SetError("Invalid notification time".into()));
                return Err(e);
            }
        };
        let mut next = snapshot.settings.clone();
        next.notification_time = time;
        self.commit(&mut snapshot, next, "Failed to update notification time")
    }

    fn commit(&self, snapshot: &mut SettingsState, next: Settings, failure: &str) -> RoResult<Settings> {
        if let Err(e) = self.store.set_json(keys::SETTINGS, &next) {
            warn!("{failure}: {e}");
            apply(snapshot, SettingsAction::SetError(failure.to_string()));
            return Err(e);
        }
        apply(snapshot, SettingsAction::SetSettings(next.clone()));
        apply(snapshot, SettingsAction::ClearError);

        info!(
            "settings updated: notifications {}, time {}",
            if next.global_notifications { "on" } else { "off" },
            next.notification_time
        );
        self.event_bus.emit(AppEvent::SettingsChanged {
            global_notifications: next.global_notifications,
            notification_time: next.notification_time.to_string(),
        });
        Ok(next)
    }
}

impl Service for SettingsStore {
    fn name(&self) -> &str { "settings" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> RoResult<()> {
        self.state = ServiceState::Running;
        info!("settings store initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RoResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
