//! Request handling for the relay protocol.
//!
//! [`RelayService`] is transport-agnostic: it turns one parsed
//! [`ClientToRelayMsg`] into one [`RelayToClientMsg`].  The WebSocket server
//! calls it once per text frame.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use scan_core::BarcodeFormat;
use scan_session::TransformOutcome;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::registry::{CallbackRegistry, HandlerOutcome};
use crate::domain::messages::{ClientToRelayMsg, RelayToClientMsg};

/// Longest session id the relay accepts.
const MAX_SESSION_ID_LEN: usize = 128;

/// Rejected relay requests.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("transform handler panicked for session {0}")]
    HandlerPanicked(String),
}

impl From<RelayError> for RelayToClientMsg {
    fn from(err: RelayError) -> Self {
        RelayToClientMsg::Error {
            message: err.to_string(),
        }
    }
}

/// Maps relay requests onto a shared [`CallbackRegistry`].
#[derive(Clone)]
pub struct RelayService {
    registry: Arc<CallbackRegistry>,
}

impl RelayService {
    pub fn new(registry: Arc<CallbackRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a service over a fresh registry with the given TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(Arc::new(CallbackRegistry::new(ttl)))
    }

    /// The registry, for hosts that register handlers in-process.
    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Parses one JSON text frame and handles it.
    pub fn handle_text(&self, text: &str) -> RelayToClientMsg {
        match serde_json::from_str::<ClientToRelayMsg>(text) {
            Ok(msg) => self.handle(msg),
            Err(err) => {
                warn!("rejecting relay frame: {err}");
                RelayError::from(err).into()
            }
        }
    }

    pub fn handle(&self, msg: ClientToRelayMsg) -> RelayToClientMsg {
        match msg {
            ClientToRelayMsg::Register { rules } => {
                let session_id = self.registry.register(move |value, format| {
                    let code = format.map_or(u32::MAX, BarcodeFormat::code);
                    HandlerOutcome::Value(rules.apply(value, code))
                });
                RelayToClientMsg::Registered { session_id }
            }
            ClientToRelayMsg::Transform {
                session_id,
                value,
                format_id,
            } => match self.transform(&session_id, &value, format_id) {
                Ok(outcome) => outcome_to_reply(outcome),
                Err(err) => {
                    warn!("{err}");
                    err.into()
                }
            },
        }
    }

    fn transform(
        &self,
        session_id: &str,
        value: &str,
        format_id: u32,
    ) -> Result<TransformOutcome, RelayError> {
        validate_session_id(session_id)?;
        debug!(%session_id, format_id, "redeeming callback");

        catch_unwind(AssertUnwindSafe(|| {
            self.registry.redeem(session_id, value, format_id)
        }))
        .map_err(|_| RelayError::HandlerPanicked(session_id.to_string()))
    }
}

fn outcome_to_reply(outcome: TransformOutcome) -> RelayToClientMsg {
    match outcome {
        TransformOutcome::Value(value) => RelayToClientMsg::Transformed { value },
        TransformOutcome::Redirect(url) => RelayToClientMsg::Redirect { url },
        TransformOutcome::Close => RelayToClientMsg::Closed,
    }
}

/// Session ids are non-empty ASCII alphanumerics, `-` or `_`.
fn validate_session_id(session_id: &str) -> Result<(), RelayError> {
    let well_formed = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

    if well_formed {
        Ok(())
    } else {
        Err(RelayError::InvalidSessionId(session_id.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
