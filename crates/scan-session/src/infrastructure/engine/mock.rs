//! Mock decode engine for testing.
//!
//! Lets tests script the camera list, inject failures at every step of the
//! start sequence, hold device enumeration open, and emit decode results as
//! if a frame had been read.  Every handle the engine binds is retained so
//! tests can assert that no camera is left running.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use scan_core::CameraDescriptor;
use tokio::sync::Notify;

use super::{DecodeEngine, DecodeEvent, DecodeSink, EngineError, EngineHandle, EngineState, StartOptions};

/// A recorded call to [`EngineHandle::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartCall {
    pub container_id: String,
    pub camera_id: String,
    pub options: StartOptions,
}

#[derive(Default)]
struct Faults {
    load: Option<String>,
    list: Option<String>,
    bind: Option<String>,
    start: VecDeque<String>,
    stop: Option<String>,
    clear: Option<String>,
}

#[derive(Default)]
struct Shared {
    faults: Mutex<Faults>,
    starts: Mutex<Vec<StartCall>>,
}

/// A scriptable [`DecodeEngine`].
pub struct MockDecodeEngine {
    shared: Arc<Shared>,
    cameras: Mutex<Vec<CameraDescriptor>>,
    camera_api: AtomicBool,
    loaded: AtomicBool,
    load_calls: Mutex<u32>,
    gate: Mutex<Option<Arc<Notify>>>,
    bound: Mutex<Vec<Arc<MockEngineHandle>>>,
}

impl MockDecodeEngine {
    /// Creates an engine that reports `labels` as its cameras, with ids
    /// `cam-0`, `cam-1`, ...
    pub fn with_cameras(labels: &[&str]) -> Self {
        let cameras = labels
            .iter()
            .enumerate()
            .map(|(i, label)| CameraDescriptor::new(format!("cam-{i}"), *label))
            .collect();
        Self {
            shared: Arc::new(Shared::default()),
            cameras: Mutex::new(cameras),
            camera_api: AtomicBool::new(true),
            loaded: AtomicBool::new(false),
            load_calls: Mutex::new(0),
            gate: Mutex::new(None),
            bound: Mutex::new(Vec::new()),
        }
    }

    pub fn set_cameras(&self, labels: &[&str]) {
        *self.cameras.lock().expect("lock poisoned") = labels
            .iter()
            .enumerate()
            .map(|(i, label)| CameraDescriptor::new(format!("cam-{i}"), *label))
            .collect();
    }

    /// Makes `ensure_loaded` fail with `signal`.
    pub fn fail_load(&self, signal: &str) {
        self.faults().load = Some(signal.to_string());
    }

    /// Simulates a runtime with no camera API.
    pub fn without_camera_api(&self) {
        self.camera_api.store(false, Ordering::SeqCst);
    }

    pub fn fail_list_cameras(&self, signal: &str) {
        self.faults().list = Some(signal.to_string());
    }

    pub fn fail_bind(&self, signal: &str) {
        self.faults().bind = Some(signal.to_string());
    }

    /// Makes the next call to [`EngineHandle::start`] fail with `signal`.
    pub fn fail_next_start(&self, signal: &str) {
        self.faults().start.push_back(signal.to_string());
    }

    /// Makes every `stop` fail with `signal` (the camera is still released).
    pub fn fail_stop(&self, signal: &str) {
        self.faults().stop = Some(signal.to_string());
    }

    /// Makes every `clear` fail with `signal`.
    pub fn fail_clear(&self, signal: &str) {
        self.faults().clear = Some(signal.to_string());
    }

    /// Holds the next `list_cameras` call until the returned [`Notify`] is
    /// signalled.
    pub fn gate_enumeration(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("lock poisoned") = Some(Arc::clone(&gate));
        gate
    }

    /// Emits a decode result from the handle that is currently scanning.
    ///
    /// Returns `false` if no handle is scanning.
    pub fn emit_decode(&self, text: &str, format_code: u32) -> bool {
        self.emit(DecodeEvent::Decoded {
            text: text.to_string(),
            format_code,
        })
    }

    pub fn emit_frame_miss(&self, reason: &str) -> bool {
        self.emit(DecodeEvent::FrameMissed {
            reason: reason.to_string(),
        })
    }

    /// Number of bound handles that still hold a camera.
    pub fn active_handles(&self) -> usize {
        self.bound
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|h| h.state().holds_camera())
            .count()
    }

    /// Number of bound handles that were never cleared.
    pub fn uncleared_handles(&self) -> usize {
        self.bound
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|h| !h.is_cleared())
            .count()
    }

    /// Container ids passed to `bind`, in order.
    pub fn bound_containers(&self) -> Vec<String> {
        self.bound
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|h| h.container_id.clone())
            .collect()
    }

    pub fn start_calls(&self) -> Vec<StartCall> {
        self.shared.starts.lock().expect("lock poisoned").clone()
    }

    /// Number of times `ensure_loaded` actually loaded the library.
    pub fn load_calls(&self) -> u32 {
        *self.load_calls.lock().expect("lock poisoned")
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.shared.faults.lock().expect("lock poisoned")
    }

    fn emit(&self, event: DecodeEvent) -> bool {
        let bound = self.bound.lock().expect("lock poisoned");
        bound
            .iter()
            .rev()
            .find(|h| h.state() == EngineState::Scanning)
            .map(|h| h.send(event))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DecodeEngine for MockDecodeEngine {
    async fn ensure_loaded(&self) -> Result<(), EngineError> {
        if let Some(signal) = self.faults().load.clone() {
            return Err(EngineError::Load(signal));
        }
        if !self.loaded.swap(true, Ordering::SeqCst) {
            *self.load_calls.lock().expect("lock poisoned") += 1;
        }
        Ok(())
    }

    fn camera_api_available(&self) -> bool {
        self.camera_api.load(Ordering::SeqCst)
    }

    async fn list_cameras(&self) -> Result<Vec<CameraDescriptor>, EngineError> {
        let gate = self.gate.lock().expect("lock poisoned").take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(signal) = self.faults().list.clone() {
            return Err(EngineError::Device(signal));
        }
        Ok(self.cameras.lock().expect("lock poisoned").clone())
    }

    fn bind(&self, container_id: &str) -> Result<Arc<dyn EngineHandle>, EngineError> {
        if let Some(signal) = self.faults().bind.clone() {
            return Err(EngineError::Device(signal));
        }
        let handle = Arc::new(MockEngineHandle {
            container_id: container_id.to_string(),
            shared: Arc::clone(&self.shared),
            state: Mutex::new(EngineState::NotStarted),
            sink: Mutex::new(None),
            cleared: AtomicBool::new(false),
        });
        self.bound
            .lock()
            .expect("lock poisoned")
            .push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// A handle bound by [`MockDecodeEngine`].
pub struct MockEngineHandle {
    container_id: String,
    shared: Arc<Shared>,
    state: Mutex<EngineState>,
    sink: Mutex<Option<DecodeSink>>,
    cleared: AtomicBool,
}

impl MockEngineHandle {
    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    fn send(&self, event: DecodeEvent) -> bool {
        match self.sink.lock().expect("lock poisoned").as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    fn release(&self) {
        *self.state.lock().expect("lock poisoned") = EngineState::NotStarted;
        *self.sink.lock().expect("lock poisoned") = None;
    }
}

#[async_trait]
impl EngineHandle for MockEngineHandle {
    async fn start(
        &self,
        camera_id: &str,
        options: &StartOptions,
        sink: DecodeSink,
    ) -> Result<(), EngineError> {
        let fault = self.shared.faults.lock().expect("lock poisoned").start.pop_front();
        self.shared
            .starts
            .lock()
            .expect("lock poisoned")
            .push(StartCall {
                container_id: self.container_id.clone(),
                camera_id: camera_id.to_string(),
                options: options.clone(),
            });
        if let Some(signal) = fault {
            return Err(EngineError::Device(signal));
        }
        *self.sink.lock().expect("lock poisoned") = Some(sink);
        *self.state.lock().expect("lock poisoned") = EngineState::Scanning;
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        if !self.state().holds_camera() {
            return Err(EngineError::Device(
                "Cannot stop, scanner is not running or paused.".to_string(),
            ));
        }
        self.release();
        match self.shared.faults.lock().expect("lock poisoned").stop.clone() {
            Some(signal) => Err(EngineError::Device(signal)),
            None => Ok(()),
        }
    }

    fn clear(&self) -> Result<(), EngineError> {
        self.cleared.store(true, Ordering::SeqCst);
        *self.sink.lock().expect("lock poisoned") = None;
        match self.shared.faults.lock().expect("lock poisoned").clear.clone() {
            Some(signal) => Err(EngineError::Device(signal)),
            None => Ok(()),
        }
    }

    fn state(&self) -> EngineState {
        *self.state.lock().expect("lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn options() -> StartOptions {
        StartOptions::from_config(&scan_core::ScannerConfig::default())
    }

    #[tokio::test]
    async fn test_bound_handle_receives_decodes_after_start() {
        // Arrange
        let engine = MockDecodeEngine::with_cameras(&["Back Camera"]);
        let handle = engine.bind("box").expect("bind");
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Act
        handle.start("cam-0", &options(), tx).await.expect("start");
        let sent = engine.emit_decode("abc", 0);

        // Assert
        assert!(sent);
        assert_eq!(
            rx.recv().await,
            Some(DecodeEvent::Decoded {
                text: "abc".to_string(),
                format_code: 0
            })
        );
        assert_eq!(engine.active_handles(), 1);
    }

    #[tokio::test]
    async fn test_stop_releases_camera_and_closes_sink() {
        let engine = MockDecodeEngine::with_cameras(&["Back Camera"]);
        let handle = engine.bind("box").expect("bind");
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.start("cam-0", &options(), tx).await.expect("start");

        handle.stop().await.expect("stop");

        assert_eq!(handle.state(), EngineState::NotStarted);
        assert_eq!(engine.active_handles(), 0);
        assert_eq!(rx.recv().await, None);
        assert!(!engine.emit_decode("late", 0));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_an_error() {
        let engine = MockDecodeEngine::with_cameras(&[]);
        let handle = engine.bind("box").expect("bind");
        assert!(handle.stop().await.is_err());
    }

    #[tokio::test]
    async fn test_injected_start_failure_is_consumed_once() {
        let engine = MockDecodeEngine::with_cameras(&["Back Camera"]);
        engine.fail_next_start("NotReadableError");
        let handle = engine.bind("box").expect("bind");

        let first = handle.start("cam-0", &options(), mpsc::unbounded_channel().0).await;
        let second = handle.start("cam-0", &options(), mpsc::unbounded_channel().0).await;

        assert_eq!(first, Err(EngineError::Device("NotReadableError".to_string())));
        assert!(second.is_ok());
        assert_eq!(engine.start_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_stop_still_releases_camera() {
        let engine = MockDecodeEngine::with_cameras(&["Back Camera"]);
        engine.fail_stop("Failed to execute 'removeChild' on 'Node'");
        let handle = engine.bind("box").expect("bind");
        handle
            .start("cam-0", &options(), mpsc::unbounded_channel().0)
            .await
            .expect("start");

        assert!(handle.stop().await.is_err());
        assert_eq!(engine.active_handles(), 0);
    }

    #[tokio::test]
    async fn test_ensure_loaded_loads_once() {
        let engine = MockDecodeEngine::with_cameras(&[]);
        engine.ensure_loaded().await.expect("load");
        engine.ensure_loaded().await.expect("load");
        assert_eq!(engine.load_calls(), 1);
    }
}
