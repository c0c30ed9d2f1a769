//! DFU-Core: over-the-air firmware update orchestration.
//!
//! This crate drives a multi-stage device firmware update against a wireless
//! peripheral and reports progress and outcomes to an external observer. The
//! wire protocol itself lives behind the transport trait; this layer owns
//! the session state machine around it.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Device**: Target peripheral identity
//! - **Firmware**: Package loading and container validation
//! - **Events**: Transport event vocabulary and translation
//! - **Progress**: Chunked-transfer accounting
//! - **Notify**: Observer channels (notifications + terminal result)
//! - **Registry**: One-live-session-per-device bookkeeping
//! - **Transport**: Update backend abstraction (mock, simulator)
//! - **Session**: High-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dfu_core::{
//!     DeviceId, DfuOptions, SessionRegistry, SimulatedTransport, TracingObserver, UpdateSession,
//! };
//!
//! let registry = Arc::new(SessionRegistry::new());
//! let session = UpdateSession::new(
//!     SimulatedTransport::default(),
//!     DeviceId::new("E5:3C:12:F0:98:11"),
//!     "firmware/app_dfu_package.zip",
//!     DfuOptions::default(),
//!     Arc::new(TracingObserver),
//!     registry,
//! );
//! session.start().expect("update failed to start");
//! ```

pub mod device;
pub mod events;
pub mod firmware;
pub mod notify;
pub mod progress;
pub mod registry;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use device::DeviceId;
pub use events::{
    CANCELLED_MESSAGE, COMPLETED_MESSAGE, DfuErrorKind, DfuEvent, DfuState, LogLevel, Translated,
    translate,
};
pub use firmware::{FirmwareError, FirmwareImage};
pub use notify::{
    Notification, NotificationKey, NullObserver, ProgressBody, ResultKey, TracingObserver,
    UpdateObserver,
};
pub use progress::{ProgressSample, ProgressTracker};
pub use registry::{RegistryError, SessionRegistry};
pub use session::{SessionError, SessionPhase, UpdateConfig, UpdateSession};
pub use transport::{
    AbortHandle, DfuOptions, DfuTransport, EventSink, MockTransport, SimulatedTransport,
    SimulatedTransportConfig, TransportError,
};
