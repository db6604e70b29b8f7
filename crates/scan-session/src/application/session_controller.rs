//! ScannerSession: the camera lifecycle state machine for one scanner widget.
//!
//! # States
//!
//! ```text
//! Idle ──start()──▶ Loading ──▶ Scanning ──decode──▶ Idle
//!   ▲                  │            │
//!   │                  ▼            ▼ switch_camera()
//!   └──stop()──────  Error        Loading ──▶ Scanning
//! ```
//!
//! `Error` is recoverable: calling [`ScannerSession::start`] again re-enters
//! `Loading`.
//!
//! # Ownership of the engine handle
//!
//! At most one [`EngineHandle`] is bound at a time and it lives in the
//! session core.  Whoever takes it out of the core is responsible for
//! stopping and clearing it.  Engine calls that touch a handle are
//! serialised by an async lock, so a new handle is never started while the
//! previous one is still being released.
//!
//! # Cancellation
//!
//! `stop()` and `destroy()` bump an epoch counter.  `start()` and
//! `switch_camera()` capture the epoch when they begin and re-check it after
//! every suspension point (engine load, enumeration, render tick, engine
//! start/stop, settle delay).  A superseded operation returns
//! [`ScannerError::Cancelled`] without touching the session state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use scan_core::{
    is_benign_teardown_signal, next_camera_index, select_initial_camera, CameraDescriptor,
    ConfigError, ErrorCategory, ScanResult, ScannerConfig, ScannerEvent,
};
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, trace, warn};

use crate::infrastructure::engine::{
    shutdown_handle, DecodeEngine, DecodeEvent, EngineError, EngineHandle, EngineState,
    StartOptions,
};
use crate::infrastructure::host::{EventSink, RenderSurface};

/// Pause between stopping the camera after a decode and delivering the
/// result, so the hardware is released before the host tears the page down.
pub const SCAN_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Pause between releasing one camera and opening the next during a switch.
pub const SWITCH_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Loading,
    Scanning,
    Error,
}

/// The classified failure shown while in [`SessionState::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFault {
    pub category: ErrorCategory,
    /// Raw failure text from the engine or the controller.
    pub signal: String,
}

/// Error type for session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScannerError {
    #[error("invalid scanner config: {0}")]
    Config(#[from] ConfigError),

    /// `start()` was called while a start or a switch was already running.
    #[error("scanner cannot start while {0:?}")]
    InvalidState(SessionState),

    /// The operation failed and the session entered `Error`.
    #[error("{category:?}: {signal}")]
    Failed {
        category: ErrorCategory,
        signal: String,
    },

    /// A later `stop()` or `destroy()` superseded the operation.
    #[error("operation superseded by stop or destroy")]
    Cancelled,
}

impl ScannerError {
    fn failed(category: ErrorCategory, signal: &str) -> Self {
        ScannerError::Failed {
            category,
            signal: signal.to_string(),
        }
    }

    /// The user-facing category, for [`ScannerError::Failed`].
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ScannerError::Failed { category, .. } => Some(*category),
            _ => None,
        }
    }
}

impl From<EngineError> for ScannerError {
    fn from(err: EngineError) -> Self {
        ScannerError::Failed {
            category: err.category(),
            signal: err.signal().to_string(),
        }
    }
}

/// Receives the one [`ScanResult`] a session produces.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, result: ScanResult);
}

/// A point-in-time view of a session, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub fault: Option<SessionFault>,
    pub cameras: Vec<CameraDescriptor>,
    pub current_index: usize,
    /// Label of the selected camera, with a "Camera N" fallback.
    pub current_label: Option<String>,
    pub has_handle: bool,
    pub switching: bool,
    pub result: Option<ScanResult>,
}

struct SessionCore {
    state: SessionState,
    fault: Option<SessionFault>,
    cameras: Vec<CameraDescriptor>,
    current_index: usize,
    container_id: Option<String>,
    handle: Option<Arc<dyn EngineHandle>>,
    /// Bumped by `stop` and `destroy`.
    epoch: u64,
    /// Bumped on every bind; decode listeners of older binds are ignored.
    bind_seq: u64,
    switching: bool,
    result: Option<ScanResult>,
}

impl SessionCore {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            fault: None,
            cameras: Vec::new(),
            current_index: 0,
            container_id: None,
            handle: None,
            epoch: 0,
            bind_seq: 0,
            switching: false,
            result: None,
        }
    }

    fn current_camera(&self) -> Option<CameraDescriptor> {
        self.cameras.get(self.current_index).cloned()
    }
}

struct Inner {
    id: String,
    config: ScannerConfig,
    options: StartOptions,
    engine: Arc<dyn DecodeEngine>,
    surface: Arc<dyn RenderSurface>,
    events: Arc<dyn EventSink>,
    sink: Arc<dyn ResultSink>,
    core: Mutex<SessionCore>,
    engine_lock: AsyncMutex<()>,
    /// Runtime the session was last driven from; `destroy()` releases the
    /// camera on it when called from outside any runtime.
    runtime: Mutex<Option<Handle>>,
}

/// One scanner widget's controller.  Cloning yields another reference to
/// the same session.
#[derive(Clone)]
pub struct ScannerSession {
    inner: Arc<Inner>,
}

impl ScannerSession {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// [`ScannerError::Config`] if `config` fails validation.  Nothing has
    /// touched the engine at that point.
    pub fn new(
        scanner_id: impl Into<String>,
        config: ScannerConfig,
        engine: Arc<dyn DecodeEngine>,
        surface: Arc<dyn RenderSurface>,
        events: Arc<dyn EventSink>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, ScannerError> {
        config.validate()?;
        let options = StartOptions::from_config(&config);
        Ok(Self {
            inner: Arc::new(Inner {
                id: scanner_id.into(),
                config,
                options,
                engine,
                surface,
                events,
                sink,
                core: Mutex::new(SessionCore::new()),
                engine_lock: AsyncMutex::new(()),
                runtime: Mutex::new(Handle::try_current().ok()),
            }),
        })
    }

    pub fn scanner_id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        self.core().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let core = self.core();
        SessionSnapshot {
            state: core.state,
            fault: core.fault.clone(),
            cameras: core.cameras.clone(),
            current_index: core.current_index,
            current_label: core
                .current_camera()
                .map(|camera| camera.display_label(core.current_index)),
            has_handle: core.handle.is_some(),
            switching: core.switching,
            result: core.result.clone(),
        }
    }

    /// The state reported by the bound engine handle, or `NotStarted` when
    /// none is bound.
    pub fn engine_state(&self) -> EngineState {
        let handle = self.core().handle.clone();
        handle.map_or(EngineState::NotStarted, |h| h.state())
    }

    /// Opens the preferred camera and starts decoding.
    ///
    /// Callable from `Idle` or `Error`.  On failure the session is left in
    /// `Error` with no handle bound.
    pub async fn start(&self) -> Result<(), ScannerError> {
        let epoch = {
            let mut core = self.core();
            if !matches!(core.state, SessionState::Idle | SessionState::Error) {
                return Err(ScannerError::InvalidState(core.state));
            }
            core.state = SessionState::Loading;
            core.fault = None;
            core.result = None;
            core.epoch
        };
        self.remember_runtime();
        info!(scanner_id = %self.inner.id, "starting scanner");

        match self.run_start(epoch).await {
            Err(ScannerError::Failed { category, signal }) => {
                Err(self.fail(epoch, category, signal).await)
            }
            Err(ScannerError::Cancelled) => {
                debug!(scanner_id = %self.inner.id, "start superseded");
                Err(ScannerError::Cancelled)
            }
            other => other,
        }
    }

    async fn run_start(&self, epoch: u64) -> Result<(), ScannerError> {
        let engine = &self.inner.engine;

        engine.ensure_loaded().await?;
        self.ensure_current(epoch)?;

        if !engine.camera_api_available() {
            return Err(ScannerError::failed(
                ErrorCategory::CameraUnavailable,
                "camera_unavailable: no camera API",
            ));
        }

        let cameras = engine.list_cameras().await?;
        self.ensure_current(epoch)?;
        if cameras.is_empty() {
            return Err(ScannerError::failed(
                ErrorCategory::CameraUnavailable,
                "camera_unavailable: no cameras found",
            ));
        }

        let index = select_initial_camera(&cameras, self.inner.config.facing_mode_value());
        debug!(scanner_id = %self.inner.id, count = cameras.len(), index, "cameras enumerated");
        {
            let mut core = self.current(epoch)?;
            core.cameras = cameras;
            core.current_index = index;
        }

        // The container is only rendered once the widget shows as loading.
        self.inner.surface.next_tick().await;
        self.ensure_current(epoch)?;
        let fallback_id = format!("{}-container", self.inner.id);
        let container = self
            .inner
            .surface
            .resolve_container(&fallback_id)
            .ok_or_else(|| {
                ScannerError::failed(
                    ErrorCategory::CameraUnavailable,
                    "camera_unavailable: render container not found",
                )
            })?;
        self.current(epoch)?.container_id = Some(container.clone());

        self.start_camera(epoch, &container).await?;
        self.enter_scanning(epoch)
    }

    /// Binds a fresh handle to `container` and starts the selected camera.
    async fn start_camera(&self, epoch: u64, container: &str) -> Result<(), ScannerError> {
        let _engine = self.inner.engine_lock.lock().await;

        let camera_id = self
            .current(epoch)?
            .current_camera()
            .map(|camera| camera.id)
            .ok_or_else(|| {
                ScannerError::failed(ErrorCategory::CameraUnavailable, "camera_unavailable")
            })?;

        let handle = self.inner.engine.bind(container)?;
        let seq = {
            let mut core = self.core();
            if core.epoch == epoch {
                core.bind_seq += 1;
                core.handle = Some(Arc::clone(&handle));
                Some(core.bind_seq)
            } else {
                None
            }
        };
        let Some(seq) = seq else {
            release_quietly(&self.inner.id, handle.as_ref()).await;
            return Err(ScannerError::Cancelled);
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.spawn_decode_listener(rx, seq);

        debug!(scanner_id = %self.inner.id, %camera_id, container, "starting decode loop");
        if let Err(err) = handle.start(&camera_id, &self.inner.options, tx).await {
            if self.take_handle_if(seq).is_some() {
                release_quietly(&self.inner.id, handle.as_ref()).await;
            }
            return Err(err.into());
        }
        self.ensure_current(epoch)
    }

    fn enter_scanning(&self, epoch: u64) -> Result<(), ScannerError> {
        let (count, camera) = {
            let mut core = self.current(epoch)?;
            core.state = SessionState::Scanning;
            core.switching = false;
            (core.cameras.len(), core.current_camera())
        };
        if let Some(camera) = camera {
            info!(scanner_id = %self.inner.id, camera = %camera.label, "scanner ready");
            self.inner
                .events
                .publish(ScannerEvent::ready(&self.inner.id, count, camera));
        }
        Ok(())
    }

    fn spawn_decode_listener(&self, mut rx: mpsc::UnboundedReceiver<DecodeEvent>, seq: u64) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let session = ScannerSession { inner };
                match event {
                    DecodeEvent::Decoded { text, format_code } => {
                        session.handle_decode(seq, &text, format_code).await;
                    }
                    DecodeEvent::FrameMissed { reason } => {
                        trace!(scanner_id = %session.inner.id, %reason, "no code in frame");
                    }
                }
            }
        });
    }

    /// Records the first decode of the session, releases the camera, then
    /// delivers the sanitised result after [`SCAN_SETTLE_DELAY`].
    async fn handle_decode(&self, seq: u64, text: &str, format_code: u32) {
        let result = {
            let mut core = self.core();
            if core.bind_seq != seq
                || core.state != SessionState::Scanning
                || core.result.is_some()
            {
                trace!(scanner_id = %self.inner.id, "decode ignored");
                return;
            }
            let result = ScanResult::from_decoded(text, format_code);
            core.result = Some(result.clone());
            result
        };
        info!(scanner_id = %self.inner.id, format_code, "barcode decoded");

        self.stop().await;
        tokio::time::sleep(SCAN_SETTLE_DELAY).await;

        self.inner
            .events
            .publish(ScannerEvent::scanned(&self.inner.id, &result));
        self.inner.sink.deliver(result).await;
    }

    /// Stops decoding and releases the camera.  Idempotent; engine errors
    /// are logged and swallowed.
    pub async fn stop(&self) {
        if let Some(handle) = self.detach() {
            let _engine = self.inner.engine_lock.lock().await;
            release_quietly(&self.inner.id, handle.as_ref()).await;
        }
        info!(scanner_id = %self.inner.id, "scanner stopped");
        self.inner
            .events
            .publish(ScannerEvent::stopped(&self.inner.id));
    }

    /// Tears the session down without waiting.
    ///
    /// The session is `Idle` when this returns and any in-flight start or
    /// switch is superseded.  The camera release is spawned on the current
    /// tokio runtime, or on the runtime that last started the session when
    /// called from outside one.
    pub fn destroy(&self) {
        if let Some(handle) = self.detach() {
            match Handle::try_current().ok().or_else(|| self.stored_runtime()) {
                Some(runtime) => {
                    let inner = Arc::clone(&self.inner);
                    runtime.spawn(async move {
                        let _engine = inner.engine_lock.lock().await;
                        release_quietly(&inner.id, handle.as_ref()).await;
                    });
                }
                None => {
                    // Handles are only bound by start(), which records its
                    // runtime, so this arm is a last resort.
                    if let Err(err) = handle.clear() {
                        debug!(scanner_id = %self.inner.id, error = %err, "ignoring clear error on destroy");
                    }
                }
            }
        }
        info!(scanner_id = %self.inner.id, "scanner destroyed");
        self.inner
            .events
            .publish(ScannerEvent::stopped(&self.inner.id));
    }

    /// Moves to the next camera in enumeration order, wrapping around.
    ///
    /// No-op unless the session is scanning with at least two cameras and
    /// no switch is already running.  Errors while releasing the previous
    /// camera are ignored.  If the next camera fails to start because the
    /// engine is still tearing down, the session settles in `Idle` with no
    /// fault.
    pub async fn switch_camera(&self) -> Result<(), ScannerError> {
        let (epoch, old) = {
            let mut core = self.core();
            if core.cameras.len() < 2 || core.switching || core.state != SessionState::Scanning {
                debug!(scanner_id = %self.inner.id, "camera switch ignored");
                return Ok(());
            }
            core.switching = true;
            core.state = SessionState::Loading;
            (core.epoch, core.handle.take())
        };
        info!(scanner_id = %self.inner.id, "switching camera");

        match self.run_switch(epoch, old).await {
            Err(ScannerError::Failed { category, signal }) => {
                Err(self.fail(epoch, category, signal).await)
            }
            other => other,
        }
    }

    async fn run_switch(
        &self,
        epoch: u64,
        old: Option<Arc<dyn EngineHandle>>,
    ) -> Result<(), ScannerError> {
        if let Some(old) = old {
            let _engine = self.inner.engine_lock.lock().await;
            release_quietly(&self.inner.id, old.as_ref()).await;
        }

        tokio::time::sleep(SWITCH_SETTLE_DELAY).await;

        let container = {
            let mut core = self.current(epoch)?;
            core.current_index = next_camera_index(core.current_index, core.cameras.len());
            core.container_id.clone()
        };
        let container = container.ok_or_else(|| {
            ScannerError::failed(
                ErrorCategory::CameraUnavailable,
                "camera_unavailable: render container not found",
            )
        })?;

        match self.start_camera(epoch, &container).await {
            Ok(()) => self.enter_scanning(epoch),
            // The engine can still be unwinding the previous camera. The
            // session settles in Idle so the user can start again.
            Err(ScannerError::Failed { signal, .. }) if is_benign_teardown_signal(&signal) => {
                debug!(scanner_id = %self.inner.id, %signal, "ignoring teardown race during switch");
                let mut core = self.current(epoch)?;
                core.state = SessionState::Idle;
                core.switching = false;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Puts the session into `Error` unless it was superseded, releasing any
    /// handle still bound.
    async fn fail(&self, epoch: u64, category: ErrorCategory, signal: String) -> ScannerError {
        let dangling = {
            let mut core = self.core();
            if core.epoch != epoch {
                return ScannerError::Cancelled;
            }
            core.state = SessionState::Error;
            core.switching = false;
            core.fault = Some(SessionFault {
                category,
                signal: signal.clone(),
            });
            core.handle.take()
        };
        warn!(
            scanner_id = %self.inner.id,
            error_type = category.error_type(),
            %signal,
            "scanner error"
        );

        if let Some(handle) = dangling {
            let _engine = self.inner.engine_lock.lock().await;
            release_quietly(&self.inner.id, handle.as_ref()).await;
        }
        self.inner
            .events
            .publish(ScannerEvent::error(&self.inner.id, &signal, category));
        ScannerError::Failed { category, signal }
    }

    /// Supersedes in-flight work, resets to `Idle`, and hands back the bound
    /// handle for the caller to release.
    fn detach(&self) -> Option<Arc<dyn EngineHandle>> {
        let mut core = self.core();
        core.epoch += 1;
        core.state = SessionState::Idle;
        core.fault = None;
        core.switching = false;
        core.handle.take()
    }

    fn take_handle_if(&self, seq: u64) -> Option<Arc<dyn EngineHandle>> {
        let mut core = self.core();
        if core.bind_seq == seq {
            core.handle.take()
        } else {
            None
        }
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), ScannerError> {
        self.current(epoch).map(drop)
    }

    fn current(&self, epoch: u64) -> Result<MutexGuard<'_, SessionCore>, ScannerError> {
        let core = self.core();
        if core.epoch == epoch {
            Ok(core)
        } else {
            Err(ScannerError::Cancelled)
        }
    }

    fn remember_runtime(&self) {
        if let Ok(current) = Handle::try_current() {
            *self
                .inner
                .runtime
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(current);
        }
    }

    fn stored_runtime(&self) -> Option<Handle> {
        self.inner
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn core(&self) -> MutexGuard<'_, SessionCore> {
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn release_quietly(scanner_id: &str, handle: &dyn EngineHandle) {
    if let Err(err) = shutdown_handle(handle).await {
        debug!(scanner_id, error = %err, "ignoring error while releasing camera");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::engine::mock::MockDecodeEngine;
    use crate::infrastructure::host::{surface::InMemorySurface, DiscardEvents};

    struct NullSink;

    #[async_trait]
    impl ResultSink for NullSink {
        async fn deliver(&self, _result: ScanResult) {}
    }

    fn session(engine: Arc<MockDecodeEngine>) -> ScannerSession {
        ScannerSession::new(
            "scanner-1",
            ScannerConfig::default(),
            engine,
            Arc::new(InMemorySurface::new()),
            Arc::new(DiscardEvents),
            Arc::new(NullSink),
        )
        .expect("valid config")
    }

    #[test]
    fn test_new_session_is_idle_without_handle() {
        let session = session(Arc::new(MockDecodeEngine::with_cameras(&["Back"])));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(!snapshot.has_handle);
        assert!(snapshot.cameras.is_empty());
        assert_eq!(session.engine_state(), EngineState::NotStarted);
    }

    #[tokio::test]
    async fn test_stop_from_idle_is_harmless() {
        let session = session(Arc::new(MockDecodeEngine::with_cameras(&["Back"])));
        session.stop().await;
        session.stop().await;
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_start_binds_fallback_container_id() {
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        let session = session(Arc::clone(&engine));

        session.start().await.expect("start");

        assert_eq!(engine.bound_containers(), vec!["scanner-1-container".to_string()]);
        assert_eq!(session.engine_state(), EngineState::Scanning);
    }

    #[tokio::test]
    async fn test_start_while_loading_is_rejected() {
        // Arrange
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        let gate = engine.gate_enumeration();
        let session = session(Arc::clone(&engine));
        let first = tokio::spawn({
            let session = session.clone();
            async move { session.start().await }
        });
        while session.state() != SessionState::Loading {
            tokio::task::yield_now().await;
        }

        // Act
        let second = session.start().await;

        // Assert
        assert_eq!(second, Err(ScannerError::InvalidState(SessionState::Loading)));
        gate.notify_one();
        assert!(first.await.expect("join").is_ok());
        assert_eq!(session.state(), SessionState::Scanning);
    }

    #[tokio::test]
    async fn test_engine_load_failure_is_engine_unavailable() {
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        engine.fail_load("script could not be fetched");
        let session = session(Arc::clone(&engine));

        let err = session.start().await.unwrap_err();

        assert_eq!(err.category(), Some(ErrorCategory::EngineUnavailable));
        assert_eq!(session.state(), SessionState::Error);
        assert!(engine.bound_containers().is_empty());
    }

    #[tokio::test]
    async fn test_missing_camera_api_is_camera_unavailable() {
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        engine.without_camera_api();
        let session = session(Arc::clone(&engine));

        let err = session.start().await.unwrap_err();

        assert_eq!(err.category(), Some(ErrorCategory::CameraUnavailable));
    }

    #[tokio::test]
    async fn test_absent_container_fails_start() {
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        let session = ScannerSession::new(
            "scanner-1",
            ScannerConfig::default(),
            Arc::clone(&engine) as Arc<dyn DecodeEngine>,
            Arc::new(InMemorySurface::absent()),
            Arc::new(DiscardEvents),
            Arc::new(NullSink),
        )
        .expect("valid config");

        let err = session.start().await.unwrap_err();

        assert_eq!(err.category(), Some(ErrorCategory::CameraUnavailable));
        assert!(engine.bound_containers().is_empty());
    }

    #[tokio::test]
    async fn test_failed_engine_start_leaves_no_handle() {
        // Arrange
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        engine.fail_next_start("NotAllowedError: Permission denied");
        let session = session(Arc::clone(&engine));

        // Act
        let err = session.start().await.unwrap_err();

        // Assert
        assert_eq!(err.category(), Some(ErrorCategory::PermissionDenied));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Error);
        assert!(!snapshot.has_handle);
        assert_eq!(engine.active_handles(), 0);
        assert_eq!(engine.uncleared_handles(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_error_reaches_scanning() {
        let engine = Arc::new(MockDecodeEngine::with_cameras(&["Back Camera"]));
        engine.fail_next_start("NotReadableError: device busy");
        let session = session(Arc::clone(&engine));
        assert!(session.start().await.is_err());

        session.start().await.expect("retry");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Scanning);
        assert!(snapshot.fault.is_none());
        assert_eq!(engine.active_handles(), 1);
    }

    #[test]
    fn test_scanner_error_from_engine_error_keeps_signal() {
        let err: ScannerError = EngineError::Device("OverconstrainedError".to_string()).into();
        assert_eq!(
            err,
            ScannerError::Failed {
                category: ErrorCategory::ConstraintsUnmet,
                signal: "OverconstrainedError".to_string()
            }
        );
    }
}
