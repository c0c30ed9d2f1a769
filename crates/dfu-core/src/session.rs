//! Update session - orchestrates one update attempt against one device.
//!
//! A session claims its device slot in the registry, validates the firmware
//! package, hands it to the transport, and from then on reacts to the event
//! stream: notifications go out for every lifecycle change and progress
//! sample, and exactly one terminal result is delivered when the transport
//! reports completion, abort, or an error. `start` and `cancel` both return
//! immediately; outcomes arrive asynchronously.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::device::DeviceId;
use crate::events::{DfuEvent, DfuState, LogLevel, Translated, translate};
use crate::firmware::{FirmwareError, FirmwareImage};
use crate::notify::{Notification, NotificationKey, ResultKey, UpdateObserver};
use crate::registry::{RegistryError, SessionRegistry};
use crate::transport::{AbortHandle, DfuOptions, DfuTransport, EventSink, TransportError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Firmware setup failed: {0}")]
    Setup(#[from] FirmwareError),

    #[error("Transport failed to start: {0}")]
    Transport(#[from] TransportError),
}

/// Where a session is in its lifetime.
///
/// `FailedSetup` and the three settled phases are terminal: once reached, no
/// further notifications or results are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, transport not yet started.
    Created,
    /// Transport operation running.
    Started,
    /// Image parsing or transport start failed before any lifecycle event.
    FailedSetup,
    /// Update completed successfully.
    SettledSuccess,
    /// Update was cancelled.
    SettledAborted,
    /// Transport reported an error.
    SettledError,
}

impl SessionPhase {
    /// Check whether the session has delivered its terminal result.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionPhase::Created | SessionPhase::Started)
    }
}

/// Configuration for an update session.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Path to the firmware package (ZIP).
    pub firmware_path: String,
    /// Identifier of the target peripheral.
    pub device_id: String,
    /// Advertise a unique device name while in update mode.
    #[serde(default)]
    pub unique_device_name_in_dfu_mode: bool,
}

impl UpdateConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: UpdateConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Transport options described by this configuration.
    pub fn options(&self) -> DfuOptions {
        DfuOptions {
            alternative_advertising_name: self.unique_device_name_in_dfu_mode,
        }
    }
}

/// Shared session state reachable from the transport's threads.
///
/// Implements `EventSink`; all event delivery funnels through `deliver`,
/// which serializes on the phase lock. That keeps per-session event order
/// intact and makes the settled check and the terminal delivery atomic with
/// respect to racing events.
struct SessionCore<O: UpdateObserver> {
    device: DeviceId,
    notify_key: NotificationKey,
    result_key: ResultKey,
    observer: Arc<O>,
    registry: Arc<SessionRegistry>,
    phase: Mutex<SessionPhase>,
}

impl<O: UpdateObserver> SessionCore<O> {
    fn notify(&self, payload: &Notification) {
        self.observer.on_notification(&self.notify_key, payload);
    }

    /// Deliver the terminal result and release the device slot. Must be
    /// called with the phase lock held and a non-terminal phase.
    fn settle(&self, phase: &mut SessionPhase, terminal: SessionPhase, success: bool, message: &str) {
        *phase = terminal;
        info!(device = %self.device, success, phase = ?terminal, "Session settled");
        self.observer.on_result(&self.result_key, success, message);
        self.registry.release(&self.device);
    }

    /// Settle with a setup error. No lifecycle notification has been or will
    /// be emitted for this attempt.
    fn fail_setup(&self, message: &str) {
        let mut phase = self.phase.lock().unwrap();
        if phase.is_terminal() {
            return;
        }
        self.settle(&mut phase, SessionPhase::FailedSetup, false, message);
    }

    /// Record that the transport operation is running.
    fn mark_started(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase == SessionPhase::Created {
            *phase = SessionPhase::Started;
        }
    }

    fn handle_event(&self, event: DfuEvent) {
        let translated = translate(&event);

        let mut phase = self.phase.lock().unwrap();
        if phase.is_terminal() {
            debug!(device = %self.device, event = ?event, "Event for settled session dropped");
            return;
        }

        match translated {
            Translated::Notify(payload) => self.notify(&payload),
            Translated::Terminal {
                notification,
                success,
                message,
            } => {
                if let Some(payload) = notification {
                    self.notify(&payload);
                }
                let terminal = if success {
                    SessionPhase::SettledSuccess
                } else if matches!(
                    event,
                    DfuEvent::StateChanged {
                        state: DfuState::Aborted
                    }
                ) {
                    SessionPhase::SettledAborted
                } else {
                    SessionPhase::SettledError
                };
                self.settle(&mut phase, terminal, success, &message);
            }
            Translated::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!(device = %self.device, "{}", message),
                LogLevel::Debug => tracing::debug!(device = %self.device, "{}", message),
                LogLevel::Info => tracing::info!(device = %self.device, "{}", message),
                LogLevel::Warn => tracing::warn!(device = %self.device, "{}", message),
                LogLevel::Error => tracing::error!(device = %self.device, "{}", message),
            },
        }
    }
}

impl<O: UpdateObserver> EventSink for SessionCore<O> {
    fn deliver(&self, event: DfuEvent) {
        self.handle_event(event);
    }
}

/// One update attempt against one target device.
pub struct UpdateSession<T: DfuTransport, O: UpdateObserver> {
    transport: T,
    firmware_path: PathBuf,
    options: DfuOptions,
    core: Arc<SessionCore<O>>,
    controller: Mutex<Option<T::Controller>>,
}

impl<T, O> UpdateSession<T, O>
where
    T: DfuTransport,
    O: UpdateObserver + 'static,
{
    /// Create a session. Nothing happens until `start`.
    pub fn new(
        transport: T,
        device: DeviceId,
        firmware_path: impl Into<PathBuf>,
        options: DfuOptions,
        observer: Arc<O>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        let notify_key = NotificationKey::for_device(&device);
        let result_key = ResultKey::for_device(&device);
        Self {
            transport,
            firmware_path: firmware_path.into(),
            options,
            core: Arc::new(SessionCore {
                device,
                notify_key,
                result_key,
                observer,
                registry,
                phase: Mutex::new(SessionPhase::Created),
            }),
            controller: Mutex::new(None),
        }
    }

    /// Create a session from a loaded configuration.
    pub fn from_config(
        transport: T,
        config: &UpdateConfig,
        observer: Arc<O>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self::new(
            transport,
            DeviceId::new(config.device_id.clone()),
            config.firmware_path.clone(),
            config.options(),
            observer,
            registry,
        )
    }

    /// Target device identifier.
    pub fn device(&self) -> &DeviceId {
        &self.core.device
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        *self.core.phase.lock().unwrap()
    }

    /// Begin the update.
    ///
    /// Claims the device slot, validates the firmware package, and starts
    /// the transport operation. Returns as soon as the operation is running;
    /// every outcome after that arrives through the observer channels. A
    /// setup failure (unreadable package, transport refusal) settles the
    /// session with a failed terminal result before returning the typed
    /// error; no lifecycle notifications are emitted for such an attempt.
    pub fn start(&self) -> Result<(), SessionError> {
        self.core.registry.claim(&self.core.device)?;

        let image = match FirmwareImage::from_file(&self.firmware_path) {
            Ok(image) => Arc::new(image),
            Err(e) => {
                warn!(device = %self.core.device, error = %e, "Firmware package rejected");
                self.core
                    .fail_setup(&format!("Failed to load firmware package: {e}"));
                return Err(SessionError::Setup(e));
            }
        };

        let sink: Arc<dyn EventSink> = self.core.clone();
        match self
            .transport
            .start(image, &self.core.device, &self.options, sink)
        {
            Ok(controller) => {
                *self.controller.lock().unwrap() = Some(controller);
                self.core.mark_started();
                info!(device = %self.core.device, "Update session started");
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.core.device, error = %e, "Transport refused to start");
                self.core
                    .fail_setup(&format!("Failed to start update: {e}"));
                Err(SessionError::Transport(e))
            }
        }
    }

    /// Request cancellation.
    ///
    /// Safe to call at any time. Returns true when there is nothing to abort
    /// yet; otherwise reports whether the transport accepted the abort
    /// request. The terminal outcome still arrives via the event stream, as
    /// an `aborted` lifecycle event, or as `completed` when cancellation
    /// races a finishing update.
    pub fn cancel(&self) -> bool {
        let controller = self.controller.lock().unwrap();
        match controller.as_ref() {
            None => true,
            Some(c) => {
                debug!(device = %self.core.device, "Abort requested");
                c.abort()
            }
        }
    }
}
