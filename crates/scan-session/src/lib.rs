//! # scan-session
//!
//! The scanner session controller and everything it needs from its host.
//!
//! - **`application`** – [`ScannerSession`], the camera lifecycle state
//!   machine; value delivery with fail-open transforms; and the thin host
//!   adapters (modal field action, header action, inline multi-instance
//!   widget).
//!
//! - **`infrastructure`** – the decode engine traits and a scriptable mock
//!   engine, the render surface and event bus seams, and TOML settings.
//!
//! The controller depends only on traits.  A host supplies a
//! [`DecodeEngine`], a [`RenderSurface`], an [`EventSink`] and a
//! [`ResultSink`] at construction time.

pub mod application;
pub mod infrastructure;

pub use application::adapters::{
    FieldActionScanner, FormHost, HeaderActionScanner, InlineScanner, ACTION_SURFACE_ID,
};
pub use application::delivery::{
    apply_transform, ClientTransform, ServerTransform, TransformError, TransformOutcome,
    ValueTransform,
};
pub use application::session_controller::{
    ResultSink, ScannerError, ScannerSession, SessionFault, SessionSnapshot, SessionState,
    SCAN_SETTLE_DELAY, SWITCH_SETTLE_DELAY,
};
pub use infrastructure::engine::{
    DecodeEngine, DecodeEvent, DecodeSink, EngineError, EngineHandle, EngineState, StartOptions,
};
pub use infrastructure::host::{
    event_bus::{ScannerEventBus, ScopedEvents},
    surface::InMemorySurface,
    DiscardEvents, EventSink, RenderSurface,
};
