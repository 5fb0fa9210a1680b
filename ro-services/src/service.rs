//! Lifecycle shared by the stores and the scheduler.
//!
//! The registry brings every service up in dependency order before the
//! first load and takes them down in reverse when the process exits. The
//! `status` command reports what each one says about itself.

use std::fmt;

use ro_core::error::RoResult;

/// Where a service is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Built, not yet initialized.
    Created,
    Running,
    Stopped,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component the registry starts and stops.
pub trait Service: Send + Sync {
    /// Name shown in health reports and logs.
    fn name(&self) -> &str;

    fn state(&self) -> ServiceState;

    /// Runs once, before any persisted state is loaded.
    fn init(&mut self) -> RoResult<()>;

    fn shutdown(&mut self) -> RoResult<()>;

    /// Only a running service counts as healthy.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}
