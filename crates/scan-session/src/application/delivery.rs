//! Value delivery: the optional transform step between a decoded value and
//! the host page.
//!
//! A host picks one [`ValueTransform`]:
//!
//! - `Client` – a typed callback run in-process.
//! - `Rules` – a serialisable [`TransformPipeline`].
//! - `Server` – a round trip to server-side logic registered against a
//!   session id (see the `scan-relay` crate).
//!
//! Delivery never blocks on a broken transform.  [`apply_transform`] falls
//! back to the sanitised input whenever the hook errors or panics.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use scan_core::{ScanResult, TransformPipeline};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for transform hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("transform hook failed: {0}")]
    Hook(String),

    #[error("transform hook panicked")]
    Panicked,

    #[error("server transform failed: {0}")]
    Server(String),

    #[error("unknown transform session: {0}")]
    UnknownSession(String),
}

/// What the host should do with a transformed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformOutcome {
    /// Write this value into the host state.
    Value(String),
    /// Navigate to this URL instead of writing a value.
    Redirect(String),
    /// Close the hosting surface without writing anything.
    Close,
}

type ClientFn = dyn Fn(&str, u32) -> Result<String, TransformError> + Send + Sync;

/// A transform callback registered by the host in-process.
#[derive(Clone)]
pub struct ClientTransform(Arc<ClientFn>);

impl ClientTransform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, u32) -> Result<String, TransformError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wraps a callback that cannot report errors.
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&str, u32) -> String + Send + Sync + 'static,
    {
        Self::new(move |value, code| Ok(f(value, code)))
    }

    /// Runs the callback, converting a panic into [`TransformError::Panicked`].
    pub fn call(&self, value: &str, format_code: u32) -> Result<String, TransformError> {
        catch_unwind(AssertUnwindSafe(|| (self.0)(value, format_code)))
            .unwrap_or(Err(TransformError::Panicked))
    }
}

impl fmt::Debug for ClientTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientTransform(..)")
    }
}

/// Server-side transform logic, reached by session id.
#[async_trait]
pub trait ServerTransform: Send + Sync {
    async fn transform(
        &self,
        session_id: &str,
        value: &str,
        format_code: u32,
    ) -> Result<TransformOutcome, TransformError>;
}

/// The transform step a host chose.
#[derive(Clone, Default)]
pub enum ValueTransform {
    #[default]
    None,
    Client(ClientTransform),
    Rules(TransformPipeline),
    Server {
        session_id: String,
        hook: Arc<dyn ServerTransform>,
    },
}

impl fmt::Debug for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueTransform::None => f.write_str("None"),
            ValueTransform::Client(client) => f.debug_tuple("Client").field(client).finish(),
            ValueTransform::Rules(rules) => f.debug_tuple("Rules").field(rules).finish(),
            ValueTransform::Server { session_id, .. } => f
                .debug_struct("Server")
                .field("session_id", session_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Runs `transform` over `result`.
///
/// Fail-open: any hook error yields `TransformOutcome::Value` with the
/// sanitised, untransformed text.
pub async fn apply_transform(transform: &ValueTransform, result: &ScanResult) -> TransformOutcome {
    let text = result.text();
    let code = result.format_code();

    let outcome = match transform {
        ValueTransform::None => return TransformOutcome::Value(text.to_string()),
        ValueTransform::Client(client) => client.call(text, code).map(TransformOutcome::Value),
        ValueTransform::Rules(rules) => Ok(TransformOutcome::Value(rules.apply(text, code))),
        ValueTransform::Server { session_id, hook } => hook.transform(session_id, text, code).await,
    };

    match outcome {
        Ok(outcome) => {
            debug!(?outcome, "transform applied");
            outcome
        }
        Err(err) => {
            warn!(error = %err, "transform failed; delivering untransformed value");
            TransformOutcome::Value(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_core::{TransformOp, TransformRule};

    struct FixedServer(Result<TransformOutcome, TransformError>);

    #[async_trait]
    impl ServerTransform for FixedServer {
        async fn transform(
            &self,
            _session_id: &str,
            _value: &str,
            _format_code: u32,
        ) -> Result<TransformOutcome, TransformError> {
            self.0.clone()
        }
    }

    fn decoded(text: &str, code: u32) -> ScanResult {
        ScanResult::from_decoded(text, code)
    }

    #[tokio::test]
    async fn test_no_transform_delivers_sanitized_text() {
        let outcome = apply_transform(&ValueTransform::None, &decoded(" <i>abc</i> ", 0)).await;
        assert_eq!(outcome, TransformOutcome::Value("abc".to_string()));
    }

    #[tokio::test]
    async fn test_client_transform_receives_format_code() {
        let transform = ValueTransform::Client(ClientTransform::infallible(|value, code| {
            format!("{code}:{value}")
        }));
        let outcome = apply_transform(&transform, &decoded("123", 8)).await;
        assert_eq!(outcome, TransformOutcome::Value("8:123".to_string()));
    }

    #[tokio::test]
    async fn test_failing_client_transform_falls_back() {
        let transform = ValueTransform::Client(ClientTransform::new(|_, _| {
            Err(TransformError::Hook("boom".to_string()))
        }));
        let outcome = apply_transform(&transform, &decoded("<b>12345</b>", 0)).await;
        assert_eq!(outcome, TransformOutcome::Value("12345".to_string()));
    }

    #[tokio::test]
    async fn test_panicking_client_transform_falls_back() {
        let transform = ValueTransform::Client(ClientTransform::infallible(|_, _| {
            panic!("host callback bug")
        }));
        let outcome = apply_transform(&transform, &decoded("12345", 0)).await;
        assert_eq!(outcome, TransformOutcome::Value("12345".to_string()));
    }

    #[tokio::test]
    async fn test_rules_transform() {
        let rules = TransformPipeline::new(vec![
            TransformRule::new(TransformOp::StripLeadingZeros).only_for(vec![8])
        ]);
        let outcome = apply_transform(&ValueTransform::Rules(rules), &decoded("0042", 8)).await;
        assert_eq!(outcome, TransformOutcome::Value("42".to_string()));
    }

    #[tokio::test]
    async fn test_server_redirect_is_passed_through() {
        let transform = ValueTransform::Server {
            session_id: "s".to_string(),
            hook: Arc::new(FixedServer(Ok(TransformOutcome::Redirect(
                "/orders/42".to_string(),
            )))),
        };
        let outcome = apply_transform(&transform, &decoded("42", 0)).await;
        assert_eq!(outcome, TransformOutcome::Redirect("/orders/42".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_falls_back() {
        let transform = ValueTransform::Server {
            session_id: "s".to_string(),
            hook: Arc::new(FixedServer(Err(TransformError::Server(
                "connection refused".to_string(),
            )))),
        };
        let outcome = apply_transform(&transform, &decoded("42", 0)).await;
        assert_eq!(outcome, TransformOutcome::Value("42".to_string()));
    }

    #[test]
    fn test_debug_does_not_require_debug_hooks() {
        let transform = ValueTransform::Client(ClientTransform::infallible(|v, _| v.to_string()));
        assert_eq!(format!("{transform:?}"), "Client(ClientTransform(..))");
    }
}
