//! # Shared Contingency Handle
//!
//! Emission mode is process-wide policy read by every builder. The handle
//! wraps the config in `Arc<RwLock<_>>` and is passed to builders
//! explicitly. Readers take a cloned snapshot; a transition is computed on
//! a copy and swapped in under the write lock, so no reader ever sees a new
//! emission code next to a stale motive.

use std::sync::Arc;

use mdfe_core::EmissionType;
use parking_lot::RwLock;

use crate::contingency::{ContingencyConfig, ContingencyError};

/// Cloneable, thread-safe handle to the current [`ContingencyConfig`].
#[derive(Debug, Clone, Default)]
pub struct ContingencyHandle {
    inner: Arc<RwLock<ContingencyConfig>>,
}

impl ContingencyHandle {
    /// Wrap an existing config (for instance one restored from disk).
    pub fn new(config: ContingencyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Consistent copy of the current config.
    pub fn snapshot(&self) -> ContingencyConfig {
        self.inner.read().clone()
    }

    /// Emission type documents must carry right now.
    pub fn emission_type(&self) -> EmissionType {
        self.inner.read().emission_type()
    }

    /// Atomically enter contingency. Returns the new config.
    pub fn activate(
        &self,
        region: &str,
        motive: &str,
        mode: Option<&str>,
    ) -> Result<ContingencyConfig, ContingencyError> {
        let mut guard = self.inner.write();
        let mut next = guard.clone();
        next.activate(region, motive, mode)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Atomically return to normal mode. Returns the new config.
    pub fn deactivate(&self) -> ContingencyConfig {
        let mut guard = self.inner.write();
        guard.deactivate();
        guard.clone()
    }

    /// Replace the whole config, e.g. after loading persisted state.
    pub fn replace(&self, config: ContingencyConfig) {
        *self.inner.write() = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_handle_clones_share_state() {
        let handle = ContingencyHandle::default();
        let other = handle.clone();
        handle.activate("PR", "Queda de energia", None).unwrap();
        assert!(other.snapshot().is_active());
        assert_eq!(other.emission_type(), EmissionType::Offline);
    }

    #[test]
    fn test_failed_activation_leaves_state_untouched() {
        let handle = ContingencyHandle::default();
        assert!(handle.activate("PR", "", None).is_err());
        assert_eq!(handle.snapshot(), ContingencyConfig::new());
    }

    #[test]
    fn test_replace_installs_loaded_config() {
        let handle = ContingencyHandle::default();
        let loaded = ContingencyConfig::load(
            r#"{"type":"OFFLINE","timestamp":1700000000,"motive":"Teste","emissionTypeCode":2}"#,
        )
        .unwrap();
        handle.replace(loaded.clone());
        assert_eq!(handle.snapshot(), loaded);
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let handle = ContingencyHandle::default();
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let h = handle.clone();
                thread::spawn(move || {
                    for n in 0..200 {
                        if (n + i) % 2 == 0 {
                            h.activate("SC", &format!("motivo {n}"), None).unwrap();
                        } else {
                            h.deactivate();
                        }
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = h.snapshot();
                        if snap.is_active() {
                            assert_eq!(snap.emission_type(), EmissionType::Offline);
                            assert!(!snap.motive().is_empty());
                            assert!(snap.activated_at().is_some());
                        } else {
                            assert_eq!(snap, ContingencyConfig::new());
                        }
                    }
                })
            })
            .collect();
        for t in writers.into_iter().chain(readers) {
            t.join().unwrap();
        }
    }
}
