//! In-memory [`RenderSurface`] for headless hosts and tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::RenderSurface;

/// A render container whose presence and element id are set directly.
pub struct InMemorySurface {
    present: AtomicBool,
    element_id: Mutex<Option<String>>,
    ticks: AtomicUsize,
}

impl InMemorySurface {
    /// A container with no element id yet; the fallback id is assigned on
    /// first resolve.
    pub fn new() -> Self {
        Self {
            present: AtomicBool::new(true),
            element_id: Mutex::new(None),
            ticks: AtomicUsize::new(0),
        }
    }

    /// A container that already carries `element_id`.
    pub fn with_element_id(element_id: &str) -> Self {
        let surface = Self::new();
        *surface.element_id.lock().unwrap_or_else(|p| p.into_inner()) =
            Some(element_id.to_string());
        surface
    }

    /// A page where the container was never rendered.
    pub fn absent() -> Self {
        let surface = Self::new();
        surface.present.store(false, Ordering::SeqCst);
        surface
    }

    pub fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    /// Number of render ticks awaited so far.
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderSurface for InMemorySurface {
    async fn next_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    fn resolve_container(&self, fallback_id: &str) -> Option<String> {
        if !self.present.load(Ordering::SeqCst) {
            return None;
        }
        let mut id = self.element_id.lock().unwrap_or_else(|p| p.into_inner());
        Some(id.get_or_insert_with(|| fallback_id.to_string()).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_id_is_assigned_once() {
        let surface = InMemorySurface::new();
        assert_eq!(surface.resolve_container("a-container").as_deref(), Some("a-container"));
        assert_eq!(surface.resolve_container("other").as_deref(), Some("a-container"));
    }

    #[test]
    fn test_existing_element_id_wins() {
        let surface = InMemorySurface::with_element_id("reader");
        assert_eq!(surface.resolve_container("x-container").as_deref(), Some("reader"));
    }

    #[test]
    fn test_absent_container_resolves_to_none() {
        let surface = InMemorySurface::absent();
        assert!(surface.resolve_container("x").is_none());
    }

    #[tokio::test]
    async fn test_next_tick_counts() {
        let surface = InMemorySurface::new();
        surface.next_tick().await;
        surface.next_tick().await;
        assert_eq!(surface.ticks(), 2);
    }
}
