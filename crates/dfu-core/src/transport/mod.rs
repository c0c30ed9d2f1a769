//! Transport layer abstraction.
//!
//! Defines the `DfuTransport` trait for the radio/protocol backend,
//! a mock implementation for unit tests, and an in-process simulator.

pub mod mock;
pub mod sim;
pub mod traits;

pub use mock::{MockController, MockTransport};
pub use sim::{SimulatedTransport, SimulatedTransportConfig};
pub use traits::{AbortHandle, DfuOptions, DfuTransport, EventSink, TransportError};
