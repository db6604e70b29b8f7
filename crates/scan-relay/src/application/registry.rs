//! One-shot callback registry.
//!
//! A host registers a handler and hands the returned session id to the
//! scanner.  The scanner redeems the id with the decoded value.  Redemption
//! removes the entry, so an id is good for exactly one call.  Entries also
//! lapse after a TTL.
//!
//! Unknown, already-redeemed and expired ids are not errors: redeeming one
//! returns the original value unchanged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scan_core::BarcodeFormat;
use scan_session::TransformOutcome;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// How long a callback stays redeemable unless configured otherwise.
pub const DEFAULT_CALLBACK_TTL: Duration = Duration::from_secs(300);

/// What a handler asks the host to do.
///
/// Handlers may return anything that converts into this: a `String` or
/// `&str` is a replacement value, and `None` means "just close".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Value(String),
    Redirect(String),
    Close,
}

impl From<String> for HandlerOutcome {
    fn from(value: String) -> Self {
        HandlerOutcome::Value(value)
    }
}

impl From<&str> for HandlerOutcome {
    fn from(value: &str) -> Self {
        HandlerOutcome::Value(value.to_string())
    }
}

impl<T: Into<HandlerOutcome>> From<Option<T>> for HandlerOutcome {
    fn from(value: Option<T>) -> Self {
        value.map_or(HandlerOutcome::Close, Into::into)
    }
}

impl From<HandlerOutcome> for TransformOutcome {
    fn from(outcome: HandlerOutcome) -> Self {
        match outcome {
            HandlerOutcome::Value(value) => TransformOutcome::Value(value),
            HandlerOutcome::Redirect(url) => TransformOutcome::Redirect(url),
            HandlerOutcome::Close => TransformOutcome::Close,
        }
    }
}

type Handler = dyn Fn(&str, Option<BarcodeFormat>) -> HandlerOutcome + Send + Sync;

struct Entry {
    handler: Arc<Handler>,
    expires_at: Instant,
}

/// Thread-safe map from session id to a one-shot handler.
pub struct CallbackRegistry {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl CallbackRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Registers `handler` under a fresh UUID v4 and returns the id.
    pub fn register<F, R>(&self, handler: F) -> String
    where
        F: Fn(&str, Option<BarcodeFormat>) -> R + Send + Sync + 'static,
        R: Into<HandlerOutcome>,
    {
        let session_id = Uuid::new_v4().to_string();
        self.register_for(session_id.clone(), handler);
        session_id
    }

    /// Registers `handler` under a caller-chosen id, replacing any existing
    /// entry and restarting its TTL.
    pub fn register_for<F, R>(&self, session_id: impl Into<String>, handler: F)
    where
        F: Fn(&str, Option<BarcodeFormat>) -> R + Send + Sync + 'static,
        R: Into<HandlerOutcome>,
    {
        let session_id = session_id.into();
        let entry = Entry {
            handler: Arc::new(
                move |value: &str, format: Option<BarcodeFormat>| -> HandlerOutcome {
                    handler(value, format).into()
                },
            ),
            expires_at: Instant::now() + self.ttl,
        };
        debug!(%session_id, "callback registered");
        self.lock().insert(session_id, entry);
    }

    /// Consumes the callback for `session_id` and runs it.
    ///
    /// Falls back to `TransformOutcome::Value(value)` if there is no live
    /// entry.  Unassigned format codes reach the handler as `None`.
    pub fn redeem(&self, session_id: &str, value: &str, format_code: u32) -> TransformOutcome {
        let entry = self.lock().remove(session_id);

        let Some(entry) = entry else {
            debug!(%session_id, "no callback registered; passing value through");
            return TransformOutcome::Value(value.to_string());
        };

        if entry.expires_at <= Instant::now() {
            debug!(%session_id, "callback expired; passing value through");
            return TransformOutcome::Value(value.to_string());
        }

        // The lock is released before the handler runs.
        (entry.handler)(value, BarcodeFormat::from_code(format_code)).into()
    }

    /// Returns `true` while `session_id` is registered and not yet expired.
    pub fn contains(&self, session_id: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .get(session_id)
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACK_TTL)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_returns_uuid_v4() {
        let registry = CallbackRegistry::default();

        let id = registry.register(|value, _| value.to_string());

        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert!(registry.contains(&id));
    }

    #[tokio::test]
    async fn test_redeem_runs_handler_once() {
        // Arrange
        let registry = CallbackRegistry::default();
        let id = registry.register(|value, _| value.to_uppercase());

        // Act
        let first = registry.redeem(&id, "test", 0);
        let second = registry.redeem(&id, "test", 0);

        // Assert: the second call finds nothing and passes the value through
        assert_eq!(first, TransformOutcome::Value("TEST".to_string()));
        assert_eq!(second, TransformOutcome::Value("test".to_string()));
        assert!(!registry.contains(&id));
    }

    #[tokio::test]
    async fn test_handler_receives_format() {
        let registry = CallbackRegistry::default();
        let id = registry.register(|value, format| {
            if format == Some(BarcodeFormat::Itf) {
                value.trim_start_matches('0').to_string()
            } else {
                value.to_string()
            }
        });

        let outcome = registry.redeem(&id, "00123", BarcodeFormat::Itf.code());

        assert_eq!(outcome, TransformOutcome::Value("123".to_string()));
    }

    #[tokio::test]
    async fn test_unassigned_format_code_reaches_handler_as_none() {
        let registry = CallbackRegistry::default();
        let id = registry.register(|_, format| match format {
            Some(_) => "known",
            None => "unknown",
        });

        assert_eq!(
            registry.redeem(&id, "x", 7),
            TransformOutcome::Value("unknown".to_string())
        );
    }

    #[test]
    fn test_unknown_id_returns_original_value() {
        let registry = CallbackRegistry::default();
        assert_eq!(
            registry.redeem("non-existent-id", "test", 0),
            TransformOutcome::Value("test".to_string())
        );
    }

    #[tokio::test]
    async fn test_handler_outcomes_normalise() {
        let registry = CallbackRegistry::default();
        let redirect =
            registry.register(|value, _| HandlerOutcome::Redirect(format!("/users/{value}")));
        let close = registry.register(|_, _| None::<String>);

        assert_eq!(
            registry.redeem(&redirect, "7", 0),
            TransformOutcome::Redirect("/users/7".to_string())
        );
        assert_eq!(registry.redeem(&close, "7", 0), TransformOutcome::Close);
    }

    #[tokio::test]
    async fn test_multiple_callbacks_are_independent() {
        let registry = CallbackRegistry::default();
        let first = registry.register(|value, _| format!("{value}_1"));
        let second = registry.register(|value, _| format!("{value}_2"));

        assert_ne!(first, second);
        assert_eq!(
            registry.redeem(&first, "test", 0),
            TransformOutcome::Value("test_1".to_string())
        );
        assert!(registry.contains(&second));
        assert_eq!(
            registry.redeem(&second, "test", 0),
            TransformOutcome::Value("test_2".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_callback_is_not_run() {
        // Arrange
        let registry = CallbackRegistry::new(Duration::from_secs(300));
        let id = registry.register(|_, _| "changed");

        // Act
        tokio::time::advance(Duration::from_secs(301)).await;

        // Assert
        assert!(!registry.contains(&id));
        assert_eq!(
            registry.redeem(&id, "original", 0),
            TransformOutcome::Value("original".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_is_live_just_before_ttl() {
        let registry = CallbackRegistry::new(Duration::from_secs(300));
        let id = registry.register(|_, _| "changed");

        tokio::time::advance(Duration::from_secs(299)).await;

        assert_eq!(
            registry.redeem(&id, "original", 0),
            TransformOutcome::Value("changed".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_entries() {
        let registry = CallbackRegistry::new(Duration::from_secs(10));
        let old = registry.register(|v, _| v.to_string());
        tokio::time::advance(Duration::from_secs(6)).await;
        let fresh = registry.register(|v, _| v.to_string());
        tokio::time::advance(Duration::from_secs(6)).await;

        let removed = registry.purge_expired();

        assert_eq!(removed, 1);
        assert!(!registry.contains(&old));
        assert!(registry.contains(&fresh));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_for_replaces_and_restarts_ttl() {
        let registry = CallbackRegistry::new(Duration::from_secs(10));
        registry.register_for("fixed", |_, _| "first");
        tokio::time::advance(Duration::from_secs(8)).await;
        registry.register_for("fixed", |_, _| "second");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(
            registry.redeem("fixed", "x", 0),
            TransformOutcome::Value("second".to_string())
        );
    }
}
