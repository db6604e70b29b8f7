//! Page-wide event bus shared by every scanner widget on a page.
//!
//! Each widget publishes onto the same broadcast channel; listeners that
//! care about one widget wrap their receiver in [`ScopedEvents`], which
//! drops events tagged with any other `scanner_id`.

use scan_core::ScannerEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::EventSink;

/// Default number of undelivered events a slow listener may fall behind by.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// A cloneable broadcast bus for [`ScannerEvent`]s.
#[derive(Debug, Clone)]
pub struct ScannerEventBus {
    tx: broadcast::Sender<ScannerEvent>,
}

impl ScannerEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.tx.subscribe()
    }

    /// Receives only the events published by widget `scanner_id`.
    pub fn scoped(&self, scanner_id: &str) -> ScopedEvents {
        ScopedEvents {
            scanner_id: scanner_id.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ScannerEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventSink for ScannerEventBus {
    fn publish(&self, event: ScannerEvent) {
        // An error only means nobody is subscribed yet.
        if self.tx.send(event).is_err() {
            debug!("scanner event published with no listeners");
        }
    }
}

/// A bus subscription filtered to one widget.
pub struct ScopedEvents {
    scanner_id: String,
    rx: broadcast::Receiver<ScannerEvent>,
}

impl ScopedEvents {
    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    /// Waits for the next event from this widget.
    ///
    /// Returns `None` once every publisher has been dropped.
    pub async fn recv(&mut self) -> Option<ScannerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.is_from(&self.scanner_id) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(scanner_id = %self.scanner_id, skipped, "event listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-published event from this widget, if any.
    pub fn try_recv(&mut self) -> Option<ScannerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.is_from(&self.scanner_id) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
