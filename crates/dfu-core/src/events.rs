//! Protocol event vocabulary and translation.
//!
//! The transport reports everything that happens during an update as a
//! single tagged event type. `translate` maps each event into the external
//! vocabulary: a notification payload, a terminal result, or a log line.
//! Translation is pure and never fails; unrecognized lifecycle codes map to
//! the `unknown` status instead of erroring.

use std::fmt;

use crate::notify::Notification;
use crate::progress::ProgressSample;

/// Terminal result message for a completed update.
pub const COMPLETED_MESSAGE: &str = "Device firmware update completed";
/// Terminal result message for a cancelled update.
pub const CANCELLED_MESSAGE: &str = "Device firmware update cancelled";

/// Lifecycle states of the device-side update process.
///
/// Transitions are driven by the transport; the session never chooses one.
/// `Completed` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfuState {
    /// Connecting to the peripheral.
    Connecting,
    /// Update process starting.
    Starting,
    /// Switching the device into update mode.
    EnablingDfuMode,
    /// Firmware transfer in progress.
    Uploading,
    /// Device is validating the received image.
    Validating,
    /// Disconnecting from the peripheral.
    Disconnecting,
    /// Update finished successfully.
    Completed,
    /// Update was aborted.
    Aborted,
    /// Unrecognized state reported by the transport.
    Unknown,
}

impl DfuState {
    /// Map a raw wire code to a state. Anything outside the eight known
    /// codes becomes `Unknown` rather than an error.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DfuState::Connecting,
            1 => DfuState::Starting,
            2 => DfuState::EnablingDfuMode,
            3 => DfuState::Uploading,
            4 => DfuState::Validating,
            5 => DfuState::Disconnecting,
            6 => DfuState::Completed,
            7 => DfuState::Aborted,
            _ => DfuState::Unknown,
        }
    }

    /// External status name carried on the notification channel.
    pub fn status_name(&self) -> &'static str {
        match self {
            DfuState::Connecting => "deviceConnecting",
            DfuState::Starting => "dfuProcessStarting",
            DfuState::EnablingDfuMode => "enablingDfuMode",
            DfuState::Uploading => "firmwareUploading",
            DfuState::Validating => "firmwareValidating",
            DfuState::Disconnecting => "deviceDisconnecting",
            DfuState::Completed => "dfuCompleted",
            DfuState::Aborted => "dfuCancelled",
            DfuState::Unknown => "unknown",
        }
    }

    /// Check whether this state ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DfuState::Completed | DfuState::Aborted)
    }
}

impl fmt::Display for DfuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_name())
    }
}

/// Coarse classification of transport-reported failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfuErrorKind {
    /// Link could not be established or was lost.
    Connection,
    /// Device stopped responding.
    Timeout,
    /// Device violated the update protocol.
    Protocol,
    /// Image rejected during validation.
    Validation,
    /// Device-side failure (bootloader error, flash write, ...).
    Device,
    /// Anything the transport could not classify.
    Unknown,
}

/// Log level for transport log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by the transport during an update.
#[derive(Debug, Clone)]
pub enum DfuEvent {
    /// Lifecycle state changed.
    StateChanged { state: DfuState },
    /// Transfer progress while uploading.
    Progress(ProgressSample),
    /// The update failed.
    Error { kind: DfuErrorKind, message: String },
    /// Diagnostic message from the protocol engine.
    Log { level: LogLevel, message: String },
}

/// Outcome of translating one event.
#[derive(Debug, Clone)]
pub enum Translated {
    /// Push a notification; the session stays live.
    Notify(Notification),
    /// The session is over. The notification, if any, goes out before the
    /// result.
    Terminal {
        notification: Option<Notification>,
        success: bool,
        message: String,
    },
    /// Forward to the log, nothing observable.
    Log { level: LogLevel, message: String },
}

/// Translate a raw transport event into the external vocabulary.
///
/// Pure mapping: lifecycle changes become status notifications, with
/// `Completed` and `Aborted` also producing the terminal result; progress is
/// forwarded 1:1 with no coalescing; errors yield the terminal result
/// directly, bypassing lifecycle mapping.
pub fn translate(event: &DfuEvent) -> Translated {
    match event {
        DfuEvent::StateChanged { state } => {
            let notification = Notification::status(state.status_name());
            match state {
                DfuState::Completed => Translated::Terminal {
                    notification: Some(notification),
                    success: true,
                    message: COMPLETED_MESSAGE.to_string(),
                },
                DfuState::Aborted => Translated::Terminal {
                    notification: Some(notification),
                    success: false,
                    message: CANCELLED_MESSAGE.to_string(),
                },
                _ => Translated::Notify(notification),
            }
        }
        DfuEvent::Progress(sample) => Translated::Notify(Notification::progress(sample)),
        DfuEvent::Error { message, .. } => Translated::Terminal {
            notification: None,
            success: false,
            message: message.clone(),
        },
        DfuEvent::Log { level, message } => Translated::Log {
            level: *level,
            message: message.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(DfuState::Connecting.status_name(), "deviceConnecting");
        assert_eq!(DfuState::Starting.status_name(), "dfuProcessStarting");
        assert_eq!(DfuState::EnablingDfuMode.status_name(), "enablingDfuMode");
        assert_eq!(DfuState::Uploading.status_name(), "firmwareUploading");
        assert_eq!(DfuState::Validating.status_name(), "firmwareValidating");
        assert_eq!(DfuState::Disconnecting.status_name(), "deviceDisconnecting");
        assert_eq!(DfuState::Completed.status_name(), "dfuCompleted");
        assert_eq!(DfuState::Aborted.status_name(), "dfuCancelled");
        assert_eq!(DfuState::Unknown.status_name(), "unknown");
    }

    #[test]
    fn test_unknown_code_maps_to_unknown() {
        assert_eq!(DfuState::from_code(3), DfuState::Uploading);
        assert_eq!(DfuState::from_code(7), DfuState::Aborted);
        assert_eq!(DfuState::from_code(8), DfuState::Unknown);
        assert_eq!(DfuState::from_code(0xFF), DfuState::Unknown);
    }

    #[test]
    fn test_lifecycle_translates_to_notification() {
        let event = DfuEvent::StateChanged {
            state: DfuState::Validating,
        };
        match translate(&event) {
            Translated::Notify(n) => assert_eq!(n.status, "firmwareValidating"),
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_completed_is_terminal_with_notification() {
        let event = DfuEvent::StateChanged {
            state: DfuState::Completed,
        };
        match translate(&event) {
            Translated::Terminal {
                notification,
                success,
                message,
            } => {
                assert_eq!(notification.unwrap().status, "dfuCompleted");
                assert!(success);
                assert_eq!(message, COMPLETED_MESSAGE);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_aborted_is_terminal_with_notification() {
        let event = DfuEvent::StateChanged {
            state: DfuState::Aborted,
        };
        match translate(&event) {
            Translated::Terminal {
                notification,
                success,
                message,
            } => {
                assert_eq!(notification.unwrap().status, "dfuCancelled");
                assert!(!success);
                assert_eq!(message, CANCELLED_MESSAGE);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_error_bypasses_lifecycle() {
        let event = DfuEvent::Error {
            kind: DfuErrorKind::Connection,
            message: "GATT CONN TIMEOUT".into(),
        };
        match translate(&event) {
            Translated::Terminal {
                notification,
                success,
                message,
            } => {
                assert!(notification.is_none());
                assert!(!success);
                assert_eq!(message, "GATT CONN TIMEOUT");
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn test_progress_forwards_fields() {
        let sample = ProgressSample {
            current_part: 2,
            parts_total: 2,
            percent: 105,
            speed_bps: 9000.0,
            avg_speed_bps: 4500.0,
        };
        match translate(&DfuEvent::Progress(sample)) {
            Translated::Notify(n) => {
                let body = n.progress.unwrap();
                // Out-of-range percent is passed through untouched.
                assert_eq!(body.percent, 105);
                assert_eq!(body.current_part, 2);
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }
}
