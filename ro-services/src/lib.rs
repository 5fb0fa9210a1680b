//! ReachOut Services - Stores, reminder scheduling, and service lifecycle.
//!
//! This crate provides the service trait, the service registry that wires
//! everything together at startup, and the concrete services:
//! - Contact store (validated CRUD, backup ring, corruption recovery)
//! - Settings store (global toggle and reminder time of day)
//! - Reminder scheduler (full rebuilds, monthly side records, missed sweep)
//! - Local reminder queue (persisted platform queue with desktop delivery)
//! - Activity log (persisted, capped, mirrored to tracing)
//! - Onboarding flag
//! - Event bus (typed change notifications between services)

pub mod service;
pub mod registry;
pub mod event_bus;
pub mod activity_log;
pub mod onboarding;
pub mod contact;
pub mod settings;
pub mod notification;
pub mod scheduler;

// Re-export key types
pub use service::{Service, ServiceState};
pub use registry::{ServiceRegistry, StartupReport};
pub use event_bus::{AppEvent, EventBus};
pub use activity_log::ActivityLog;
pub use onboarding::Onboarding;
pub use contact::{ContactStore, ContactSummary, LoadOutcome};
pub use settings::SettingsStore;
pub use notification::{LocalReminderQueue, ReminderPlatform};
pub use scheduler::{ReminderScheduler, RescheduleReport, SchedulingFailure};
