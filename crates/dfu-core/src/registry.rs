//! Live-session registry.
//!
//! One update session may run against a given device at a time. The registry
//! is the shared marker that enforces this: `start()` claims the device slot
//! before touching the transport, and the slot is released when the session
//! settles (or when setup fails before the transport was started). Claims
//! and releases may race with event delivery from transport threads, so the
//! map is mutex-guarded.

use std::collections::HashSet;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::device::DeviceId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("An update session is already running for device {device}")]
    SessionActive { device: DeviceId },
}

/// Tracks which devices currently have a live update session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    live: Mutex<HashSet<DeviceId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the session slot for a device.
    pub fn claim(&self, device: &DeviceId) -> Result<(), RegistryError> {
        let mut live = self.live.lock().unwrap();
        if !live.insert(device.clone()) {
            return Err(RegistryError::SessionActive {
                device: device.clone(),
            });
        }
        debug!(device = %device, "Session slot claimed");
        Ok(())
    }

    /// Release the session slot. Idempotent; releasing an unclaimed slot is
    /// a no-op.
    pub fn release(&self, device: &DeviceId) {
        let mut live = self.live.lock().unwrap();
        if live.remove(device) {
            debug!(device = %device, "Session slot released");
        }
    }

    /// Check whether a device has a live session.
    pub fn is_live(&self, device: &DeviceId) -> bool {
        self.live.lock().unwrap().contains(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_release() {
        let registry = SessionRegistry::new();
        let device = DeviceId::new("aa-bb");

        assert!(!registry.is_live(&device));
        registry.claim(&device).unwrap();
        assert!(registry.is_live(&device));

        registry.release(&device);
        assert!(!registry.is_live(&device));
    }

    #[test]
    fn test_double_claim_rejected() {
        let registry = SessionRegistry::new();
        let device = DeviceId::new("aa-bb");

        registry.claim(&device).unwrap();
        let err = registry.claim(&device).unwrap_err();
        assert_eq!(
            err,
            RegistryError::SessionActive {
                device: device.clone()
            }
        );

        // Released slot can be claimed again.
        registry.release(&device);
        registry.claim(&device).unwrap();
    }

    #[test]
    fn test_devices_are_independent() {
        let registry = SessionRegistry::new();
        let a = DeviceId::new("aa");
        let b = DeviceId::new("bb");

        registry.claim(&a).unwrap();
        registry.claim(&b).unwrap();
        registry.release(&a);
        assert!(!registry.is_live(&a));
        assert!(registry.is_live(&b));
    }

    #[test]
    fn test_release_unclaimed_is_noop() {
        let registry = SessionRegistry::new();
        registry.release(&DeviceId::new("never-claimed"));
    }
}
