//! Host adapters: thin wiring between one [`ScannerSession`] and the page
//! that embeds it.
//!
//! Three widgets share the same controller:
//!
//! - [`FieldActionScanner`] – a modal opened from a form field.  The result
//!   is written into the form state at `state_path` and the modal closes.
//! - [`HeaderActionScanner`] – a modal opened from a page header action.
//!   The result goes to server logic, which may answer with a redirect.
//! - [`InlineScanner`] – an embedded widget.  Several can live on one page;
//!   each publishes on a shared [`ScannerEventBus`] under its own id.
//!
//! Each adapter only translates host lifecycle events into
//! `start()`/`destroy()` calls and the delivered result into host writes.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use scan_core::{
    ErrorCategory, HostEvent, ScanResult, ScannerConfig, ScannerEvent, ScannerEventKind,
};
use tracing::debug;
use uuid::Uuid;

use crate::application::delivery::{
    apply_transform, ServerTransform, TransformOutcome, ValueTransform,
};
use crate::application::session_controller::{ResultSink, ScannerError, ScannerSession};
use crate::infrastructure::engine::DecodeEngine;
use crate::infrastructure::host::{
    event_bus::{ScannerEventBus, ScopedEvents},
    DiscardEvents, EventSink, RenderSurface,
};

/// Surface id of the modal opened by the field and header actions.
pub const ACTION_SURFACE_ID: &str = "barcode-scanner";

/// The form page hosting a modal scanner.
#[cfg_attr(test, mockall::automock)]
pub trait FormHost: Send + Sync {
    /// Writes `value` into the form state at `state_path`.
    fn set_state(&self, state_path: &str, value: &str);
    /// Closes the modal the scanner lives in.
    fn close_surface(&self);
    fn redirect(&self, url: &str);
}

/// Returns a fresh id of the form `scanner-<uuid>`.
pub fn generate_scanner_id() -> String {
    format!("scanner-{}", Uuid::new_v4().simple())
}

/// `true` when `event` means the widget on `own_surface` is going away.
pub fn is_teardown_event(own_surface: &str, event: &HostEvent) -> bool {
    match event {
        HostEvent::SurfaceClosing => true,
        HostEvent::SurfaceOpened { surface_id } => surface_id != own_surface,
    }
}

/// Delivers a result to a [`FormHost`].
struct FormDelivery {
    host: Arc<dyn FormHost>,
    state_path: Option<String>,
    transform: ValueTransform,
}

#[async_trait]
impl ResultSink for FormDelivery {
    async fn deliver(&self, result: ScanResult) {
        match apply_transform(&self.transform, &result).await {
            TransformOutcome::Value(value) => {
                if let Some(path) = &self.state_path {
                    self.host.set_state(path, &value);
                }
                self.host.close_surface();
            }
            TransformOutcome::Redirect(url) => self.host.redirect(&url),
            TransformOutcome::Close => self.host.close_surface(),
        }
    }
}

// ── Field action ──────────────────────────────────────────────────────────────

/// Modal scanner opened from a form field.
pub struct FieldActionScanner {
    session: ScannerSession,
}

impl FieldActionScanner {
    pub fn new(
        config: ScannerConfig,
        engine: Arc<dyn DecodeEngine>,
        surface: Arc<dyn RenderSurface>,
        host: Arc<dyn FormHost>,
        state_path: Option<String>,
        transform: ValueTransform,
    ) -> Result<Self, ScannerError> {
        let sink = Arc::new(FormDelivery {
            host,
            state_path,
            transform,
        });
        let session = ScannerSession::new(
            generate_scanner_id(),
            config,
            engine,
            surface,
            Arc::new(DiscardEvents),
            sink,
        )?;
        Ok(Self { session })
    }

    pub fn session(&self) -> &ScannerSession {
        &self.session
    }

    /// Called when the modal opens.
    pub async fn open(&self) -> Result<(), ScannerError> {
        self.session.start().await
    }

    pub fn handle_host_event(&self, event: &HostEvent) {
        if is_teardown_event(ACTION_SURFACE_ID, event) {
            debug!(scanner_id = self.session.scanner_id(), ?event, "tearing down field scanner");
            self.session.destroy();
        }
    }
}

// ── Header action ─────────────────────────────────────────────────────────────

/// Modal scanner opened from a header action, backed by server logic.
pub struct HeaderActionScanner {
    session: ScannerSession,
}

impl HeaderActionScanner {
    /// `session_id` identifies the handler the page registered with the
    /// server when it rendered the action.
    pub fn new(
        config: ScannerConfig,
        engine: Arc<dyn DecodeEngine>,
        surface: Arc<dyn RenderSurface>,
        host: Arc<dyn FormHost>,
        session_id: String,
        hook: Arc<dyn ServerTransform>,
    ) -> Result<Self, ScannerError> {
        let sink = Arc::new(FormDelivery {
            host,
            state_path: None,
            transform: ValueTransform::Server { session_id, hook },
        });
        let session = ScannerSession::new(
            generate_scanner_id(),
            config,
            engine,
            surface,
            Arc::new(DiscardEvents),
            sink,
        )?;
        Ok(Self { session })
    }

    pub fn session(&self) -> &ScannerSession {
        &self.session
    }

    pub async fn open(&self) -> Result<(), ScannerError> {
        self.session.start().await
    }

    pub fn handle_host_event(&self, event: &HostEvent) {
        if is_teardown_event(ACTION_SURFACE_ID, event) {
            self.session.destroy();
        }
    }
}

// ── Inline (multi-instance) widget ────────────────────────────────────────────

/// Called with the transformed value and its format code.
pub type ScanCallback = Arc<dyn Fn(&str, u32) + Send + Sync>;
/// Called with the raw error signal and its category.
pub type ErrorCallback = Arc<dyn Fn(ErrorCategory, &str) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    scan: Mutex<Vec<ScanCallback>>,
    error: Mutex<Vec<ErrorCallback>>,
}

impl Callbacks {
    fn scan(&self) -> Vec<ScanCallback> {
        self.scan.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn error(&self) -> Vec<ErrorCallback> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

struct InlineDelivery {
    transform: ValueTransform,
    callbacks: Arc<Callbacks>,
}

#[async_trait]
impl ResultSink for InlineDelivery {
    async fn deliver(&self, result: ScanResult) {
        match apply_transform(&self.transform, &result).await {
            TransformOutcome::Value(value) => {
                for callback in self.callbacks.scan() {
                    callback(&value, result.format_code());
                }
            }
            other => {
                debug!(outcome = ?other, "inline scanner has no surface to redirect or close");
            }
        }
    }
}

/// Forwards to the shared bus and fires the widget's error callbacks.
struct InlineEvents {
    bus: ScannerEventBus,
    callbacks: Arc<Callbacks>,
}

impl EventSink for InlineEvents {
    fn publish(&self, event: ScannerEvent) {
        if let ScannerEventKind::ScannerError { error, error_type } = &event.kind {
            let category = ErrorCategory::from_error_type(error_type)
                .unwrap_or(ErrorCategory::CameraUnavailable);
            for callback in self.callbacks.error() {
                callback(category, error);
            }
        }
        self.bus.publish(event);
    }
}

/// An embedded scanner widget.
pub struct InlineScanner {
    session: ScannerSession,
    bus: ScannerEventBus,
    callbacks: Arc<Callbacks>,
}

impl InlineScanner {
    /// `scanner_id` defaults to a generated `scanner-<uuid>`.
    pub fn new(
        scanner_id: Option<String>,
        config: ScannerConfig,
        engine: Arc<dyn DecodeEngine>,
        surface: Arc<dyn RenderSurface>,
        bus: ScannerEventBus,
        transform: ValueTransform,
    ) -> Result<Self, ScannerError> {
        let callbacks = Arc::new(Callbacks::default());
        let events = Arc::new(InlineEvents {
            bus: bus.clone(),
            callbacks: Arc::clone(&callbacks),
        });
        let sink = Arc::new(InlineDelivery {
            transform,
            callbacks: Arc::clone(&callbacks),
        });
        let session = ScannerSession::new(
            scanner_id.unwrap_or_else(generate_scanner_id),
            config,
            engine,
            surface,
            events,
            sink,
        )?;
        Ok(Self {
            session,
            bus,
            callbacks,
        })
    }

    pub fn scanner_id(&self) -> &str {
        self.session.scanner_id()
    }

    pub fn session(&self) -> &ScannerSession {
        &self.session
    }

    pub fn on_scan<F>(&self, f: F)
    where
        F: Fn(&str, u32) + Send + Sync + 'static,
    {
        self.callbacks
            .scan
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(f));
    }

    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(ErrorCategory, &str) + Send + Sync + 'static,
    {
        self.callbacks
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(f));
    }

    /// This widget's events on the shared bus.
    pub fn events(&self) -> ScopedEvents {
        self.bus.scoped(self.scanner_id())
    }

    pub async fn start(&self) -> Result<(), ScannerError> {
        self.session.start().await
    }

    pub async fn stop(&self) {
        self.session.stop().await
    }

    pub async fn switch_camera(&self) -> Result<(), ScannerError> {
        self.session.switch_camera().await
    }

    pub fn destroy(&self) {
        self.session.destroy()
    }

    pub fn handle_host_event(&self, event: &HostEvent) {
        if is_teardown_event(self.scanner_id(), event) {
            self.session.destroy();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
