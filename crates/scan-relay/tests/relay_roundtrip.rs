//! End-to-end tests: a real relay on a loopback port, driven by
//! `RelayClient` and by raw WebSocket frames.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use scan_core::{ScanResult, TransformOp, TransformPipeline, TransformRule};
use scan_relay::application::{HandlerOutcome, RelayService};
use scan_relay::domain::RelayToClientMsg;
use scan_relay::infrastructure::{serve, RelayClient};
use scan_session::{apply_transform, ServerTransform, TransformOutcome, ValueTransform};

struct Relay {
    addr: SocketAddr,
    service: RelayService,
    running: Arc<AtomicBool>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Relay {
    async fn start(ttl: Duration, sweep: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = RelayService::with_ttl(ttl);
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(serve(listener, service.clone(), sweep, Arc::clone(&running)));
        Self {
            addr,
            service,
            running,
            task,
        }
    }

    fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    fn client(&self) -> RelayClient {
        RelayClient::new(self.url())
    }

    async fn shutdown(self) {
        self.running.store(false, Ordering::Relaxed);
        self.task.await.unwrap().unwrap();
    }
}

fn strip_itf_zeros() -> TransformPipeline {
    TransformPipeline::new(vec![
        TransformRule::new(TransformOp::StripLeadingZeros).only_for(vec![8])
    ])
}

#[tokio::test]
async fn test_registered_rules_apply_once() {
    // Arrange
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;
    let client = relay.client();
    let session_id = client.register(strip_itf_zeros()).await.unwrap();

    // Act
    let first = client.transform(&session_id, "00123", 8).await.unwrap();
    let second = client.transform(&session_id, "00123", 8).await.unwrap();

    // Assert
    assert_eq!(first, TransformOutcome::Value("123".to_string()));
    assert_eq!(second, TransformOutcome::Value("00123".to_string()));

    relay.shutdown().await;
}

#[tokio::test]
async fn test_server_transform_feeds_delivery() {
    // Arrange: a decoded ITF value with markup, routed through the relay
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;
    let client = relay.client();
    let session_id = client.register(strip_itf_zeros()).await.unwrap();
    let transform = ValueTransform::Server {
        session_id,
        hook: Arc::new(client),
    };

    // Act
    let outcome = apply_transform(&transform, &ScanResult::from_decoded("<b>000042</b>", 8)).await;

    // Assert
    assert_eq!(outcome, TransformOutcome::Value("42".to_string()));

    relay.shutdown().await;
}

#[tokio::test]
async fn test_in_process_handler_redirects() {
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;
    let session_id = relay
        .service
        .registry()
        .register(|value, _| HandlerOutcome::Redirect(format!("/users/{value}")));

    let outcome = relay.client().transform(&session_id, "7", 0).await.unwrap();

    assert_eq!(outcome, TransformOutcome::Redirect("/users/7".to_string()));

    relay.shutdown().await;
}

#[tokio::test]
async fn test_invalid_session_id_is_a_server_error() {
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;

    let result = relay.client().transform("not a valid id", "42", 0).await;

    assert!(result.is_err());

    relay.shutdown().await;
}

#[tokio::test]
async fn test_invalid_session_id_falls_open_in_delivery() {
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;
    let transform = ValueTransform::Server {
        session_id: "../bad".to_string(),
        hook: Arc::new(relay.client()),
    };

    let outcome = apply_transform(&transform, &ScanResult::from_decoded("12345", 0)).await;

    assert_eq!(outcome, TransformOutcome::Value("12345".to_string()));

    relay.shutdown().await;
}

#[tokio::test]
async fn test_one_connection_serves_many_frames() {
    // Arrange
    let relay = Relay::start(Duration::from_secs(300), Duration::from_secs(60)).await;
    let (mut ws, _) = connect_async(relay.url()).await.unwrap();

    let mut replies = Vec::new();
    for frame in [
        WsMessage::Text(r#"{"type":"Register","rules":[{"op":"uppercase"}]}"#.to_string()),
        WsMessage::Text("{not json".to_string()),
        WsMessage::Binary(vec![1, 2, 3]),
    ] {
        // Act
        ws.send(frame).await.unwrap();
        let reply = loop {
            match ws.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => {
                    break serde_json::from_str::<RelayToClientMsg>(&text).unwrap();
                }
                _ => continue,
            }
        };
        replies.push(reply);
    }

    // Assert: one reply per frame, in order
    assert!(matches!(replies[0], RelayToClientMsg::Registered { .. }));
    assert!(matches!(replies[1], RelayToClientMsg::Error { .. }));
    assert!(matches!(replies[2], RelayToClientMsg::Error { .. }));

    ws.close(None).await.unwrap();
    relay.shutdown().await;
}

#[tokio::test]
async fn test_sweep_purges_expired_callbacks() {
    // Arrange
    let relay = Relay::start(Duration::from_millis(50), Duration::from_millis(20)).await;
    let session_id = relay.client().register(strip_itf_zeros()).await.unwrap();
    assert_eq!(relay.service.registry().len(), 1);

    // Act
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Assert: removed by the sweeper without any redemption
    assert!(relay.service.registry().is_empty());
    let outcome = relay.client().transform(&session_id, "00123", 8).await.unwrap();
    assert_eq!(outcome, TransformOutcome::Value("00123".to_string()));

    relay.shutdown().await;
}
