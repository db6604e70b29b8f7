//! Host page seams.
//!
//! The controller needs two things from the page that embeds it: a render
//! container to bind the decode engine to ([`RenderSurface`]) and somewhere
//! to publish its lifecycle events ([`EventSink`]).

use async_trait::async_trait;
use scan_core::ScannerEvent;

pub mod event_bus;
pub mod surface;

/// The page region the scanner renders into.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Resolves once the page has rendered the state change that made the
    /// container visible.
    async fn next_tick(&self);

    /// Returns the container's element id, assigning `fallback_id` if the
    /// element has none.  `None` means the element is not in the page.
    fn resolve_container(&self, fallback_id: &str) -> Option<String>;
}

/// Receives the events a scanner publishes.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ScannerEvent);
}

/// An [`EventSink`] that drops every event, for single-widget hosts that
/// only care about the delivered value.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn publish(&self, _event: ScannerEvent) {}
}
