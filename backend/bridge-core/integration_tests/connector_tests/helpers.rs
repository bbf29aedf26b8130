//! Test helpers for connector integration tests.
//!
//! This module provides:
//! - A mock companion app (WebSocket server on an ephemeral port)
//! - A notification recorder wired into a connector
//! - Config builders with short timers

use bridge_core::config::BridgeConfig;
use bridge_core::{Connector, ReconnectPolicy, handler};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Every notification name the connector emits.
pub const ALL_NOTIFICATIONS: [&str; 10] = [
    "connected",
    "authenticated",
    "auth_failed",
    "message",
    "complete",
    "heartbeat",
    "error",
    "disconnected",
    "reconnecting",
    "reconnect_exhausted",
];

// ============================================
// MOCK PEER
// ============================================

/// Mock companion app listening on 127.0.0.1.
pub struct MockPeer {
    listener: TcpListener,
    pub url: String,
}

impl MockPeer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock peer");
        let port = listener.local_addr().expect("local addr").port();
        Self {
            listener,
            url: format!("ws://127.0.0.1:{port}/ws"),
        }
    }

    /// Accept the next bridge connection and complete the WebSocket handshake.
    pub async fn accept(&self) -> PeerConnection {
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("Timed out waiting for the bridge to connect")
            .expect("Accept failed");
        let ws = accept_async(stream).await.expect("WebSocket handshake failed");
        PeerConnection { ws }
    }

    /// True if a connection arrives within `wait`.
    pub async fn accepts_within(&self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.listener.accept())
            .await
            .is_ok()
    }
}

/// URL with nothing listening on it.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("ws://127.0.0.1:{port}/ws")
}

/// The peer side of one accepted socket.
pub struct PeerConnection {
    ws: WebSocketStream<TcpStream>,
}

impl PeerConnection {
    /// Next text frame as JSON, skipping control frames.
    pub async fn recv(&mut self) -> Value {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for a frame from the bridge")
                .expect("Bridge closed the socket")
                .expect("Error receiving frame");

            match message {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("Bridge sent invalid JSON");
                }
                Message::Close(_) => panic!("Bridge closed the socket"),
                _ => continue,
            }
        }
    }

    /// Next event whose `type` is not a heartbeat.
    pub async fn recv_event(&mut self) -> Value {
        loop {
            let value = self.recv().await;
            if value["type"] != "transport:connection:heartbeat" {
                return value;
            }
        }
    }

    /// Next event of `event_type`, skipping anything else.
    pub async fn recv_type(&mut self, event_type: &str) -> Value {
        loop {
            let value = self.recv().await;
            if value["type"] == event_type {
                return value;
            }
        }
    }

    pub async fn send(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("Failed to send to bridge");
    }

    pub async fn send_event(&mut self, event_type: &str, data: Value) {
        self.send(json!({
            "type": event_type,
            "id": "peer-event",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "data": data,
        }))
        .await;
    }

    /// Read the bridge's authenticate request and accept it.
    pub async fn authenticate(&mut self) -> Value {
        let request = self.recv_type("module:authenticate").await;
        self.send_event("module:authenticated", json!({ "authenticated": true }))
            .await;
        request
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// True if the bridge closed the socket within `wait`.
    pub async fn is_closed_within(&mut self, wait: Duration) -> bool {
        loop {
            match tokio::time::timeout(wait, self.ws.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }
}

// ============================================
// CONNECTOR SIDE
// ============================================

pub fn test_config(url: &str) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.airi.url = url.to_string();
    config.airi.auth.token = Some(common::RedactedToken::new(TEST_AUTH_TOKEN));
    config
}

pub fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy::default().with_delays(Duration::from_millis(20), Duration::from_millis(100))
}

pub fn test_connector(config: BridgeConfig) -> Connector {
    let limit = config.reconnect_limit();
    Connector::with_policy(config, fast_policy().with_max_attempts(limit))
        .expect("Test config should be valid")
}

/// Records every notification a connector emits, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    pub fn attach(connector: &Connector) -> Self {
        let recorder = Self::default();
        for name in ALL_NOTIFICATIONS {
            let events = Arc::clone(&recorder.events);
            connector.on(
                name,
                handler(move |payload| {
                    events
                        .lock()
                        .unwrap()
                        .push((name.to_string(), payload.clone()));
                    Ok(())
                }),
            );
        }
        recorder
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }

    pub fn payloads(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Wait until `name` has been emitted at least `times` times.
    pub async fn wait_for(&self, name: &str, times: usize) {
        let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
        while self.count(name) < times {
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timed out waiting for {times}x '{name}', saw {:?}",
                self.names()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Connect `connector` to `peer`, accept the socket and complete authentication.
pub async fn connect_and_authenticate(
    connector: &Connector,
    peer: &MockPeer,
    recorder: &Recorder,
) -> PeerConnection {
    let (outcome, mut conn) = tokio::join!(connector.connect(), peer.accept());
    outcome.expect("Connect should succeed");
    conn.authenticate().await;
    recorder.wait_for("authenticated", 1).await;
    conn
}
