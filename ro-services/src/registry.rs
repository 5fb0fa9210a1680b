//! Service registry for dependency injection and lifecycle management.
//!
//! The registry builds every service around one shared key-value store and
//! event bus, initializes them in dependency order, and runs the startup
//! sequence: settings, contacts, delivery of reminders that came due while
//! nothing was running, missed-reminder sweep, full rebuild.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use ro_core::config::ConfigHandle;
use ro_core::error::{RoError, RoResult};
use ro_models::{Database, KeyValueStore, NotificationTime, ScheduledReminder};

use crate::activity_log::ActivityLog;
use crate::contact::{ContactStore, LoadOutcome};
use crate::event_bus::EventBus;
use crate::notification::{LocalReminderQueue, ReminderPlatform};
use crate::onboarding::Onboarding;
use crate::scheduler::{ReminderScheduler, RescheduleReport};
use crate::service::{Service, ServiceState};
use crate::settings::SettingsStore;

/// What happened during `start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupReport {
    pub load: LoadOutcome,
    /// Reminders that came due since the last run and were shown.
    pub delivered: Vec<ScheduledReminder>,
    pub missed: Vec<String>,
    pub reminders: RescheduleReport,
}

/// Central service registry that owns all application services.
pub struct ServiceRegistry {
    /// Application configuration.
    pub config: ConfigHandle,
    /// Shared record storage.
    pub store: Arc<dyn KeyValueStore>,
    /// Application-level event bus.
    pub event_bus: EventBus,
    pub activity_log: ActivityLog,
    pub onboarding: Onboarding,
    pub settings: SettingsStore,
    pub contacts: ContactStore,
    /// The platform the scheduler writes to.
    pub reminders: Arc<dyn ReminderPlatform>,
    pub scheduler: ReminderScheduler,
    listener: Option<JoinHandle<()>>,
}

impl ServiceRegistry {
    /// Build all services over the given store, using the platform queue
    /// for reminders.
    pub async fn new(config: ConfigHandle, store: Arc<dyn KeyValueStore>) -> RoResult<Self> {
        let queue = {
            let cfg = config.read().await;
            LocalReminderQueue::new(store.clone())
                .with_app_name(cfg.notifications.app_name.clone())
                .with_desktop(cfg.notifications.desktop)
        };
        Self::with_platform(config, store, Arc::new(queue)).await
    }

    /// Build all services with a custom reminder platform.
    pub async fn with_platform(
        config: ConfigHandle,
        store: Arc<dyn KeyValueStore>,
        platform: Arc<dyn ReminderPlatform>,
    ) -> RoResult<Self> {
        let (default_time, channel_id) = {
            let cfg = config.read().await;
            let time: NotificationTime = cfg.notifications.default_time.parse().map_err(|e| {
                RoError::Config(format!("notifications.default_time: {e}"))
            })?;
            (time, cfg.notifications.channel_id.clone())
        };

        let event_bus = EventBus::new(256);
        let activity_log = ActivityLog::new(store.clone());
        let onboarding = Onboarding::new(store.clone());
        let settings = SettingsStore::new(store.clone(), event_bus.clone(), activity_log.clone())
            .with_default_time(default_time);
        let contacts = ContactStore::new(store.clone(), event_bus.clone(), activity_log.clone());
        let scheduler = ReminderScheduler::new(
            contacts.clone(),
            settings.clone(),
            platform.clone(),
            store.clone(),
            event_bus.clone(),
            activity_log.clone(),
        )
        .with_channel_id(channel_id);

        Ok(Self {
            config,
            reminders: platform,
            store,
            event_bus,
            activity_log,
            onboarding,
            settings,
            contacts,
            scheduler,
            listener: None,
        })
    }

    /// Open the SQLite store named by the configuration and build all services.
    pub async fn open(config: ConfigHandle) -> RoResult<Self> {
        let database = {
            let cfg = config.read().await;
            let path = cfg.effective_db_path()?;
            Database::init(&path, &cfg.storage)?
        };
        Self::new(config, Arc::new(database)).await
    }

    fn services_mut(&mut self) -> [&mut dyn Service; 5] {
        [
            &mut self.activity_log,
            &mut self.onboarding,
            &mut self.settings,
            &mut self.contacts,
            &mut self.scheduler,
        ]
    }

    fn services(&self) -> [&dyn Service; 5] {
        [
            &self.activity_log,
            &self.onboarding,
            &self.settings,
            &self.contacts,
            &self.scheduler,
        ]
    }

    /// Initialize all services in dependency order.
    pub fn init_all(&mut self) -> RoResult<()> {
        for service in self.services_mut() {
            let name = service.name().to_string();
            if let Err(e) = service.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(RoError::ServiceInit(format!("{name}: {e}")));
            }
        }
        info!("all services initialized");
        Ok(())
    }

    /// Initialize services, load persisted state, show reminders that came
    /// due since the last run, sweep missed monthly reminders and rebuild
    /// the full reminder set.
    ///
    /// Delivery runs before the rebuild, which replaces every pending entry.
    pub async fn start(&mut self) -> RoResult<StartupReport> {
        self.init_all()?;

        self.settings.load().await;
        let load = self.contacts.load().await;
        let now = Utc::now();
        let delivered = match self.deliver_due(now).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("could not deliver pending reminders: {e}");
                Vec::new()
            }
        };
        let missed = self.scheduler.check_missed(now).await;
        let reminders = self.scheduler.rebuild_all().await?;

        info!(
            "startup complete: {} contacts, {} reminders",
            self.contacts.list().await.len(),
            reminders.scheduled.len()
        );
        Ok(StartupReport {
            load,
            delivered,
            missed,
            reminders,
        })
    }

    /// Rebuild reminders in the background whenever contacts or settings change.
    pub fn start_listener(&mut self) {
        if self.listener.is_none() {
            self.listener = Some(self.scheduler.start_listener());
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Show due reminders and re-arm monthly contacts.
    pub async fn deliver_due(&self, now: DateTime<Utc>) -> RoResult<Vec<ScheduledReminder>> {
        let delivered = self.reminders.deliver_due(now).await?;
        for reminder in &delivered {
            if let Err(e) = self.scheduler.handle_delivered(reminder, now).await {
                error!("failed to re-arm reminder for {}: {e}", reminder.payload.contact_id);
            }
        }
        Ok(delivered)
    }

    /// Stop the listener and shut down services in reverse order.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        for service in self.services_mut().into_iter().rev() {
            if let Err(e) = service.shutdown() {
                error!("error shutting down service {}: {e}", service.name());
            }
        }
        info!("all services shut down");
    }

    /// Get the health status of all services.
    pub fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        self.services()
            .iter()
            .map(|svc| (svc.name().to_string(), svc.state(), svc.is_healthy()))
            .collect()
    }
}
