//! JSON message types for the relay WebSocket protocol.
//!
//! Every frame is a JSON text frame with a `"type"` discriminant:
//!
//! ```json
//! {"type":"Register","rules":[{"op":"strip_leading_zeros","formats":[8]}]}
//! {"type":"Transform","session_id":"6f1c…","value":"00123","format_id":8}
//! {"type":"Transformed","value":"123"}
//! ```
//!
//! One request frame yields exactly one reply frame, in order.

use scan_core::TransformPipeline;
use serde::{Deserialize, Serialize};

// ── Client → Relay ────────────────────────────────────────────────────────────

/// Requests a scanner (or its host) sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientToRelayMsg {
    /// Registers a rule pipeline as a one-shot callback.
    ///
    /// Answered with [`RelayToClientMsg::Registered`].
    Register {
        #[serde(flatten)]
        rules: TransformPipeline,
    },

    /// Redeems a session id with a decoded value.
    Transform {
        session_id: String,
        value: String,
        /// Engine wire code of the decoded symbology.
        format_id: u32,
    },
}

// ── Relay → Client ────────────────────────────────────────────────────────────

/// Replies the relay sends, one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayToClientMsg {
    Registered { session_id: String },

    /// The (possibly unchanged) value to write into the host state.
    Transformed { value: String },

    /// The host should navigate to `url`.
    Redirect { url: String },

    /// The host should close its surface without writing a value.
    Closed,

    /// The request was rejected.  No callback was consumed.
    Error { message: String },
}

impl RelayToClientMsg {
    /// Returns the variant name for log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RelayToClientMsg::Registered { .. } => "Registered",
            RelayToClientMsg::Transformed { .. } => "Transformed",
            RelayToClientMsg::Redirect { .. } => "Redirect",
            RelayToClientMsg::Closed => "Closed",
            RelayToClientMsg::Error { .. } => "Error",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scan_core::{TransformOp, TransformRule};

    #[test]
    fn test_transform_request_parses_from_json() {
        // Arrange
        let json = r#"{"type":"Transform","session_id":"abc","value":"00123","format_id":8}"#;

        // Act
        let msg: ClientToRelayMsg = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(
            msg,
            ClientToRelayMsg::Transform {
                session_id: "abc".to_string(),
                value: "00123".to_string(),
                format_id: 8,
            }
        );
    }

    #[test]
    fn test_register_request_carries_rules_inline() {
        let json = r#"{"type":"Register","rules":[{"op":"strip_leading_zeros","formats":[8]}]}"#;

        let msg: ClientToRelayMsg = serde_json::from_str(json).unwrap();

        let expected = TransformPipeline::new(vec![
            TransformRule::new(TransformOp::StripLeadingZeros).only_for(vec![8])
        ]);
        assert_eq!(msg, ClientToRelayMsg::Register { rules: expected });
    }

    #[test]
    fn test_register_without_rules_is_an_empty_pipeline() {
        let msg: ClientToRelayMsg = serde_json::from_str(r#"{"type":"Register"}"#).unwrap();
        assert_eq!(
            msg,
            ClientToRelayMsg::Register {
                rules: TransformPipeline::default()
            }
        );
    }

    #[test]
    fn test_closed_reply_serialises_to_bare_tag() {
        let json = serde_json::to_string(&RelayToClientMsg::Closed).unwrap();
        assert_eq!(json, r#"{"type":"Closed"}"#);
    }

    #[test]
    fn test_redirect_reply_json_shape() {
        let json = serde_json::to_value(RelayToClientMsg::Redirect {
            url: "/orders/42".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "Redirect");
        assert_eq!(json["url"], "/orders/42");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<ClientToRelayMsg>(r#"{"type":"Explode"}"#);
        assert!(result.is_err());
    }
}
