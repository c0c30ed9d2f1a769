//! Observer channels for update notifications and terminal results.
//!
//! Every session owns two channels, both scoped by a key derived from the
//! target device identifier: a streaming notification channel for state and
//! progress payloads, and a result channel that fires exactly once with the
//! terminal outcome. The keys keep concurrent sessions against different
//! devices from cross-talking, and let a late event for an already-settled
//! session be matched and dropped.

use std::fmt;

use serde::Serialize;

use crate::device::DeviceId;
use crate::progress::ProgressSample;

/// Key scoping the streaming notification channel to one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey(String);

impl NotificationKey {
    pub fn for_device(device: &DeviceId) -> Self {
        Self(format!("updateDFUNotification|{device}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key scoping the terminal result channel to one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey(String);

impl ResultKey {
    pub fn for_device(device: &DeviceId) -> Self {
        Self(format!("updateDFU|{device}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Progress fields as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBody {
    pub percent: i32,
    pub speed: f64,
    pub avg_speed: f64,
    pub current_part: i32,
    pub parts_total: i32,
}

impl From<&ProgressSample> for ProgressBody {
    fn from(sample: &ProgressSample) -> Self {
        Self {
            percent: sample.percent,
            speed: sample.speed_bps,
            avg_speed: sample.avg_speed_bps,
            current_part: sample.current_part,
            parts_total: sample.parts_total,
        }
    }
}

/// One payload on the notification channel.
///
/// Serializes to `{"status": "..."}` for lifecycle updates and to
/// `{"status": "progressChanged", "progress": {...}}` for progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressBody>,
}

impl Notification {
    /// Lifecycle status payload.
    pub fn status(status: &'static str) -> Self {
        Self {
            status,
            progress: None,
        }
    }

    /// Progress payload.
    pub fn progress(sample: &ProgressSample) -> Self {
        Self {
            status: "progressChanged",
            progress: Some(ProgressBody::from(sample)),
        }
    }
}

/// Observer receiving session output.
///
/// Implement this in the host layer. `on_notification` may fire any number
/// of times while a session is live; `on_result` fires exactly once per
/// session. Both are invoked from the transport's execution context.
pub trait UpdateObserver: Send + Sync {
    fn on_notification(&self, key: &NotificationKey, payload: &Notification);
    fn on_result(&self, key: &ResultKey, success: bool, message: &str);
}

/// No-op observer that discards all output.
pub struct NullObserver;

impl UpdateObserver for NullObserver {
    fn on_notification(&self, _key: &NotificationKey, _payload: &Notification) {
        // Do nothing
    }

    fn on_result(&self, _key: &ResultKey, _success: bool, _message: &str) {
        // Do nothing
    }
}

/// Observer that logs output using tracing.
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_notification(&self, key: &NotificationKey, payload: &Notification) {
        match &payload.progress {
            Some(p) => tracing::debug!(
                key = %key,
                part = p.current_part,
                of = p.parts_total,
                percent = p.percent,
                speed = %format!("{:.0} B/s", p.speed),
                "Progress"
            ),
            None => tracing::info!(key = %key, status = payload.status, "Status"),
        }
    }

    fn on_result(&self, key: &ResultKey, success: bool, message: &str) {
        if success {
            tracing::info!(key = %key, "{}", message);
        } else {
            tracing::error!(key = %key, "{}", message);
        }
    }
}
