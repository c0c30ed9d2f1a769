//! Target device identity.
//!
//! A DFU target is addressed by the identifier the radio layer assigned to
//! the peripheral (a UUID on most hosts, a MAC address on others). The core
//! treats it as an opaque string: it keys the session registry and the two
//! observer channels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a target peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create an identifier from whatever the radio layer reported.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
