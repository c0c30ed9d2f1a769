//! Transport capability traits.
//!
//! The radio link and the device-side protocol engine live behind
//! `DfuTransport`: the session hands it a validated image and a sink, the
//! transport runs the update from its own execution context and reports
//! everything through the sink. The returned controller is the only way to
//! abort a running operation.

use std::sync::Arc;

use thiserror::Error;

use crate::device::DeviceId;
use crate::events::DfuEvent;
use crate::firmware::FirmwareImage;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {device}")]
    DeviceNotFound { device: DeviceId },

    #[error("Failed to start update operation: {0}")]
    StartFailed(String),

    #[error("Transport is shutting down")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options forwarded to the transport when starting an update.
#[derive(Debug, Clone, Copy, Default)]
pub struct DfuOptions {
    /// Advertise under a unique name while the device is in update mode, so
    /// the host reconnects to the right peripheral when several identical
    /// devices are nearby.
    pub alternative_advertising_name: bool,
}

/// Receiver for transport events.
///
/// The session core implements this; the transport calls it from whatever
/// thread runs the protocol. Implementations must tolerate calls after the
/// session has settled.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: DfuEvent);
}

/// Handle to a running update operation.
pub trait AbortHandle: Send + Sync {
    /// Request an abort. Returns whether the transport accepted the request;
    /// the authoritative outcome still arrives through the event stream.
    fn abort(&self) -> bool;
}

/// Abstract update transport.
///
/// This trait enables:
/// - Production radio backends
/// - Mock implementation for unit testing
/// - The in-process simulator
pub trait DfuTransport: Send + Sync {
    type Controller: AbortHandle;

    /// Begin the update operation in the background and return the abort
    /// controller. Events flow into `sink` until a terminal event is
    /// emitted.
    fn start(
        &self,
        image: Arc<FirmwareImage>,
        target: &DeviceId,
        options: &DfuOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self::Controller, TransportError>;
}
