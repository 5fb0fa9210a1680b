//! First-run onboarding flag.

use std::sync::Arc;

use tracing::{info, warn};

use ro_core::constants::keys;
use ro_core::error::RoResult;
use ro_models::KeyValueStore;

use crate::service::{Service, ServiceState};

#[derive(Clone)]
pub struct Onboarding {
    state: ServiceState,
    store: Arc<dyn KeyValueStore>,
}

impl Onboarding {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: ServiceState::Created,
            store,
        }
    }

    /// Whether onboarding was completed. A read failure counts as not completed.
    pub fn is_complete(&self) -> bool {
        match self.store.get(keys::ONBOARDING) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("error checking onboarding status: {e}");
                false
            }
        }
    }

    pub fn mark_complete(&self) -> RoResult<()> {
        self.store.set(keys::ONBOARDING, "true")?;
        info!("onboarding marked as complete");
        Ok(())
    }

    pub fn reset(&self) -> RoResult<()> {
        self.store.remove(keys::ONBOARDING)?;
        info!("onboarding reset");
        Ok(())
    }
}

impl Service for Onboarding {
    fn name(&self) -> &str { "onboarding" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> RoResult<()> {
        self.state = ServiceState::Running;
        Ok(())
    }
    fn shutdown(&mut self) -> RoResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ro_models::MemoryStore;

    #[test]
    fn test_onboarding_flag() {
        let store = MemoryStore::new();
        let onboarding = Onboarding::new(Arc::new(store.clone()));
        assert!(!onboarding.is_complete());

        onboarding.mark_complete().unwrap();
        assert!(onboarding.is_complete());
        assert_eq!(store.get(keys::ONBOARDING).unwrap().as_deref(), Some("true"));

        onboarding.reset().unwrap();
        assert!(!onboarding.is_complete());
    }

    #[test]
    fn test_only_literal_true_counts() {
        let store = MemoryStore::new();
        store.set(keys::ONBOARDING, "yes").unwrap();
        assert!(!Onboarding::new(Arc::new(store)).is_complete());
    }

    #[test]
    fn test_read_failure_is_not_complete() {
        let store = MemoryStore::new();
        store.set(keys::ONBOARDING, "true").unwrap();
        store.set_fail_reads(true);
        assert!(!Onboarding::new(Arc::new(store)).is_complete());
    }
}
