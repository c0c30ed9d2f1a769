//! In-process simulated transport.
//!
//! Plays a full device-side update lifecycle on a background thread:
//! connect, switch to update mode, upload the image in chunks with progress
//! samples, validate, disconnect. Abort requests are honored at chunk
//! boundaries, the way a real protocol engine processes them between
//! packets. Used by the CLI and by concurrency tests; no radio involved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::traits::{AbortHandle, DfuOptions, DfuTransport, EventSink, TransportError};
use crate::device::DeviceId;
use crate::events::{DfuErrorKind, DfuEvent, DfuState, LogLevel};
use crate::firmware::FirmwareImage;
use crate::progress::ProgressTracker;

/// Shape of the simulated transfer.
#[derive(Debug, Clone)]
pub struct SimulatedTransportConfig {
    /// Number of image parts to report.
    pub parts: i32,
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Pause between chunks.
    pub chunk_interval: Duration,
    /// Inject a transport error after this many chunks.
    pub fail_after_chunks: Option<u64>,
}

impl Default for SimulatedTransportConfig {
    fn default() -> Self {
        Self {
            parts: 1,
            chunk_size: 4096,
            chunk_interval: Duration::from_millis(5),
            fail_after_chunks: None,
        }
    }
}

/// Transport stand-in that simulates the device side of an update.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransport {
    config: SimulatedTransportConfig,
}

impl SimulatedTransport {
    pub fn new(config: SimulatedTransportConfig) -> Self {
        Self { config }
    }
}

/// Abort flag shared with the simulation thread.
pub struct SimController {
    abort: Arc<AtomicBool>,
}

impl AbortHandle for SimController {
    fn abort(&self) -> bool {
        self.abort.store(true, Ordering::SeqCst);
        true
    }
}

impl DfuTransport for SimulatedTransport {
    type Controller = SimController;

    fn start(
        &self,
        image: Arc<FirmwareImage>,
        target: &DeviceId,
        options: &DfuOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self::Controller, TransportError> {
        let abort = Arc::new(AtomicBool::new(false));
        let config = self.config.clone();
        let device = target.clone();
        let options = *options;

        info!(device = %device, size = image.len(), "Starting simulated update");

        let thread_abort = abort.clone();
        thread::spawn(move || {
            run_update(&config, &image, &device, &options, sink.as_ref(), &thread_abort);
        });

        Ok(SimController { abort })
    }
}

fn run_update(
    config: &SimulatedTransportConfig,
    image: &FirmwareImage,
    device: &DeviceId,
    options: &DfuOptions,
    sink: &dyn EventSink,
    abort: &AtomicBool,
) {
    sink.deliver(DfuEvent::Log {
        level: LogLevel::Debug,
        message: format!(
            "Simulated link to {device} (alternative advertising name: {})",
            options.alternative_advertising_name
        ),
    });

    for state in [
        DfuState::Connecting,
        DfuState::Starting,
        DfuState::EnablingDfuMode,
        DfuState::Uploading,
    ] {
        if aborted(abort, sink) {
            return;
        }
        sink.deliver(DfuEvent::StateChanged { state });
    }

    let parts = config.parts.max(1);
    let part_size = (image.len() as u64).div_ceil(parts as u64);
    let mut tracker = ProgressTracker::new(parts, Instant::now());
    let mut chunks_sent = 0u64;

    for part in 1..=parts {
        let size = if part == parts {
            (image.len() as u64).saturating_sub(part_size * (parts as u64 - 1))
        } else {
            part_size
        };
        tracker.begin_part(part, size);

        let mut remaining = size;
        while remaining > 0 {
            if aborted(abort, sink) {
                return;
            }
            if let Some(limit) = config.fail_after_chunks
                && chunks_sent >= limit
            {
                debug!(device = %device, chunks_sent, "Injecting simulated failure");
                sink.deliver(DfuEvent::Error {
                    kind: DfuErrorKind::Device,
                    message: format!("Simulated transport failure after {chunks_sent} chunks"),
                });
                return;
            }

            thread::sleep(config.chunk_interval);
            let chunk = remaining.min(config.chunk_size);
            remaining -= chunk;
            chunks_sent += 1;

            let sample = tracker.record(chunk, Instant::now());
            sink.deliver(DfuEvent::Progress(sample));
        }
    }

    for state in [
        DfuState::Validating,
        DfuState::Disconnecting,
        DfuState::Completed,
    ] {
        if aborted(abort, sink) {
            return;
        }
        sink.deliver(DfuEvent::StateChanged { state });
    }
}

fn aborted(abort: &AtomicBool, sink: &dyn EventSink) -> bool {
    if abort.load(Ordering::SeqCst) {
        sink.deliver(DfuEvent::StateChanged {
            state: DfuState::Aborted,
        });
        return true;
    }
    false
}
