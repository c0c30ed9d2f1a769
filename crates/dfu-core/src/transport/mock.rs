//! Mock transport for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::{AbortHandle, DfuOptions, DfuTransport, EventSink, TransportError};
use crate::device::DeviceId;
use crate::events::{DfuErrorKind, DfuEvent, DfuState};
use crate::firmware::FirmwareImage;
use crate::progress::ProgressSample;

/// Mock transport for unit testing session logic.
///
/// Captures each `start` call and hands the event sink back to the test,
/// which then plays the device side by injecting events.
#[derive(Clone)]
pub struct MockTransport {
    /// Sinks captured from start calls, in order.
    sinks: Arc<Mutex<Vec<Arc<dyn EventSink>>>>,
    /// Recorded (device, image size, options) per start call.
    starts: Arc<Mutex<Vec<(DeviceId, usize, DfuOptions)>>>,
    /// What controllers report back from abort.
    abort_accepted: Arc<AtomicBool>,
    /// Number of abort calls across all controllers.
    abort_calls: Arc<AtomicUsize>,
    /// Scripted failure for the next start call.
    fail_start: Arc<Mutex<Option<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sinks: Arc::new(Mutex::new(Vec::new())),
            starts: Arc::new(Mutex::new(Vec::new())),
            abort_accepted: Arc::new(AtomicBool::new(true)),
            abort_calls: Arc::new(AtomicUsize::new(0)),
            fail_start: Arc::new(Mutex::new(None)),
        }
    }

    /// The sink captured from the most recent start call.
    pub fn sink(&self) -> Arc<dyn EventSink> {
        self.sinks
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no start call captured")
    }

    /// Inject a raw event into the most recent session.
    pub fn emit(&self, event: DfuEvent) {
        self.sink().deliver(event);
    }

    /// Inject a lifecycle state change.
    pub fn emit_state(&self, state: DfuState) {
        self.emit(DfuEvent::StateChanged { state });
    }

    /// Inject a progress sample.
    pub fn emit_progress(&self, sample: ProgressSample) {
        self.emit(DfuEvent::Progress(sample));
    }

    /// Inject an error event.
    pub fn emit_error(&self, kind: DfuErrorKind, message: &str) {
        self.emit(DfuEvent::Error {
            kind,
            message: message.to_string(),
        });
    }

    /// Recorded start calls.
    pub fn starts(&self) -> Vec<(DeviceId, usize, DfuOptions)> {
        self.starts.lock().unwrap().clone()
    }

    /// Configure what abort reports back.
    pub fn set_abort_accepted(&self, accepted: bool) {
        self.abort_accepted.store(accepted, Ordering::SeqCst);
    }

    /// Number of abort calls seen so far.
    pub fn abort_calls(&self) -> usize {
        self.abort_calls.load(Ordering::SeqCst)
    }

    /// Make the next start call fail.
    pub fn fail_next_start(&self, message: &str) {
        *self.fail_start.lock().unwrap() = Some(message.to_string());
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller handed out by `MockTransport`.
#[derive(Debug)]
pub struct MockController {
    abort_accepted: Arc<AtomicBool>,
    abort_calls: Arc<AtomicUsize>,
}

impl AbortHandle for MockController {
    fn abort(&self) -> bool {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        self.abort_accepted.load(Ordering::SeqCst)
    }
}

impl DfuTransport for MockTransport {
    type Controller = MockController;

    fn start(
        &self,
        image: Arc<FirmwareImage>,
        target: &DeviceId,
        options: &DfuOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self::Controller, TransportError> {
        if let Some(message) = self.fail_start.lock().unwrap().take() {
            return Err(TransportError::StartFailed(message));
        }

        self.starts
            .lock()
            .unwrap()
            .push((target.clone(), image.len(), *options));
        self.sinks.lock().unwrap().push(sink);

        Ok(MockController {
            abort_accepted: self.abort_accepted.clone(),
            abort_calls: self.abort_calls.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CountingSink(Mutex<Vec<DfuEvent>>);

    impl EventSink for CountingSink {
        fn deliver(&self, event: DfuEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn image() -> Arc<FirmwareImage> {
        let mut data = vec![0u8; 256];
        data[..4].copy_from_slice(&[0x50, 0x4B, 0x03, 0x04]);
        Arc::new(FirmwareImage::from_bytes(data, "test.zip").unwrap())
    }

    #[test]
    fn test_mock_captures_start() {
        let mock = MockTransport::new();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        let device = DeviceId::new("aa");

        mock.start(image(), &device, &DfuOptions::default(), sink.clone())
            .unwrap();

        let starts = mock.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, device);
        assert_eq!(starts[0].1, 256);

        mock.emit_state(DfuState::Connecting);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_mock_abort_scripting() {
        let mock = MockTransport::new();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        let controller = mock
            .start(image(), &DeviceId::new("aa"), &DfuOptions::default(), sink)
            .unwrap();

        assert!(controller.abort());
        mock.set_abort_accepted(false);
        assert!(!controller.abort());
        assert_eq!(mock.abort_calls(), 2);
    }

    #[test]
    fn test_mock_scripted_start_failure() {
        let mock = MockTransport::new();
        let sink = Arc::new(CountingSink(Mutex::new(Vec::new())));
        mock.fail_next_start("radio off");

        let err = mock
            .start(image(), &DeviceId::new("aa"), &DfuOptions::default(), sink)
            .unwrap_err();
        assert!(matches!(err, TransportError::StartFailed(m) if m == "radio off"));
        assert!(mock.starts().is_empty());
    }
}
