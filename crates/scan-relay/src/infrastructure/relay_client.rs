//! Scanner-side client for the relay.
//!
//! [`RelayClient`] implements [`ServerTransform`], so a host can pass it as
//! the hook of `ValueTransform::Server`.  Each call opens a short-lived
//! WebSocket connection, sends one request and waits for one reply.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use scan_core::TransformPipeline;
use scan_session::infrastructure::storage::config::RelaySettings;
use scan_session::{ServerTransform, TransformError, TransformOutcome};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::debug;

use crate::domain::messages::{ClientToRelayMsg, RelayToClientMsg};

/// Default bound on one request/reply round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket client for a running `scan-relay`.
#[derive(Debug, Clone)]
pub struct RelayClient {
    url: String,
    request_timeout: Duration,
}

impl RelayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(settings.url.clone())
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Registers a rule pipeline and returns its session id.
    pub async fn register(&self, rules: TransformPipeline) -> Result<String, TransformError> {
        match self.request(&ClientToRelayMsg::Register { rules }).await? {
            RelayToClientMsg::Registered { session_id } => Ok(session_id),
            other => Err(unexpected(&other)),
        }
    }

    async fn request(&self, msg: &ClientToRelayMsg) -> Result<RelayToClientMsg, TransformError> {
        let json = serde_json::to_string(msg).map_err(|e| TransformError::Server(e.to_string()))?;

        timeout(self.request_timeout, self.round_trip(json))
            .await
            .map_err(|_| {
                TransformError::Server(format!(
                    "relay at {} did not answer within {:?}",
                    self.url, self.request_timeout
                ))
            })?
    }

    async fn round_trip(&self, json: String) -> Result<RelayToClientMsg, TransformError> {
        let server = |e: tokio_tungstenite::tungstenite::Error| {
            TransformError::Server(format!("relay at {}: {e}", self.url))
        };

        let (mut ws, _response) = connect_async(self.url.as_str()).await.map_err(server)?;
        ws.send(WsMessage::Text(json)).await.map_err(server)?;

        let reply = loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    break serde_json::from_str::<RelayToClientMsg>(&text)
                        .map_err(|e| TransformError::Server(format!("bad relay reply: {e}")))?;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(TransformError::Server(
                        "relay closed the connection without replying".to_string(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(server(e)),
            }
        };

        if let Err(e) = ws.close(None).await {
            debug!("relay close handshake failed: {e}");
        }
        Ok(reply)
    }
}

#[async_trait]
impl ServerTransform for RelayClient {
    async fn transform(
        &self,
        session_id: &str,
        value: &str,
        format_code: u32,
    ) -> Result<TransformOutcome, TransformError> {
        let request = ClientToRelayMsg::Transform {
            session_id: session_id.to_string(),
            value: value.to_string(),
            format_id: format_code,
        };

        match self.request(&request).await? {
            RelayToClientMsg::Transformed { value } => Ok(TransformOutcome::Value(value)),
            RelayToClientMsg::Redirect { url } => Ok(TransformOutcome::Redirect(url)),
            RelayToClientMsg::Closed => Ok(TransformOutcome::Close),
            RelayToClientMsg::Error { message } => Err(TransformError::Server(message)),
            other @ RelayToClientMsg::Registered { .. } => Err(unexpected(&other)),
        }
    }
}

fn unexpected(reply: &RelayToClientMsg) -> TransformError {
    TransformError::Server(format!("unexpected relay reply: {}", reply.type_name()))
}
