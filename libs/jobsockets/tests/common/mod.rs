//! Common test utilities for jobsockets integration tests
//!
//! - [`FakeConnector`]: in-memory transport driven by the test
//! - [`MockWsServer`]: a real WebSocket server speaking the job socket envelope

#![allow(dead_code)]

use jobsockets::core::state::{AtomicConnectionState, ConnectionState};
use jobsockets::traits::*;
use jobsockets::WireMessage;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// =============================================================================
// Fake transport
// =============================================================================

/// One connection attempt made through [`FakeConnector`]
#[derive(Clone)]
pub struct FakeConnection {
    pub url: String,
    pub subprotocol_prefix: String,
    events: TransportEvents,
    state: Arc<AtomicConnectionState>,
    sent: Arc<Mutex<Vec<String>>>,
    close_calls: Arc<Mutex<usize>>,
}

impl FakeConnection {
    /// Finish the handshake: state becomes `Open`, then `Established` fires
    pub fn establish(&self) {
        self.mark_open();
        self.announce_established();
    }

    /// First half of [`establish`](Self::establish): the transport reports
    /// `Open` but the manager has not been told yet
    pub fn mark_open(&self) {
        self.state.set(ConnectionState::Open);
    }

    pub fn announce_established(&self) {
        self.events.emit(TransportEvent::Established);
    }

    /// Simulate the server dropping the connection
    pub fn drop_connection(&self) {
        self.state.set(ConnectionState::Closed);
        self.events.emit(TransportEvent::Closed);
    }

    pub fn fail(&self, reason: &str) {
        self.events.emit(TransportEvent::Error(reason.to_string()));
    }

    /// Deliver an inbound text frame
    pub fn deliver(&self, text: &str) {
        self.events
            .emit(TransportEvent::Message(WsMessage::Text(text.to_string())));
    }

    pub fn deliver_binary(&self, data: &[u8]) {
        self.events
            .emit(TransportEvent::Message(WsMessage::Binary(data.to_vec())));
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Frames sent on this connection, parsed back into envelopes
    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent
            .lock()
            .iter()
            .map(|text| WireMessage::from_json(text).expect("manager sent invalid JSON"))
            .collect()
    }

    /// Sent frames of one `type`
    pub fn sent_of_kind(&self, kind: &str) -> Vec<WireMessage> {
        self.sent().into_iter().filter(|m| m.kind == kind).collect()
    }

    pub fn close_calls(&self) -> usize {
        *self.close_calls.lock()
    }
}

struct FakeTransport {
    state: Arc<AtomicConnectionState>,
    sent: Arc<Mutex<Vec<String>>>,
    close_calls: Arc<Mutex<usize>>,
}

impl Transport for FakeTransport {
    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn send(&self, text: String) -> Result<()> {
        if !self.state.is_open() {
            return Err(SocketError::ConnectionClosed("fake transport not open".into()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        *self.close_calls.lock() += 1;
        self.state.set(ConnectionState::Closed);
    }
}

/// Connector that records every attempt and never touches the network
#[derive(Clone, Default)]
pub struct FakeConnector {
    connections: Arc<Mutex<Vec<FakeConnection>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn connection(&self, index: usize) -> FakeConnection {
        self.connections.lock()[index].clone()
    }

    /// Most recent connection attempt
    pub fn last(&self) -> FakeConnection {
        self.connections
            .lock()
            .last()
            .cloned()
            .expect("no connection attempted yet")
    }

    /// All frames sent across every connection
    pub fn all_sent(&self) -> Vec<WireMessage> {
        self.connections
            .lock()
            .iter()
            .flat_map(|c| c.sent())
            .collect()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, request: &ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let close_calls = Arc::new(Mutex::new(0));

        self.connections.lock().push(FakeConnection {
            url: request.url.clone(),
            subprotocol_prefix: request.subprotocol_prefix.clone(),
            events,
            state: Arc::clone(&state),
            sent: Arc::clone(&sent),
            close_calls: Arc::clone(&close_calls),
        });

        Box::new(FakeTransport {
            state,
            sent,
            close_calls,
        })
    }
}

// =============================================================================
// Mock WebSocket server
// =============================================================================

/// A mock WebSocket server for end-to-end tests
///
/// Sends `connection-established` right after the handshake, records every
/// text frame it receives, and answers each `job-progress-listen` with one
/// `job-progress` update for the same id.
pub struct MockWsServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    accepted: Arc<Mutex<usize>>,
    shutdown: Arc<Notify>,
    kick: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(Mutex::new(0));
        let shutdown = Arc::new(Notify::new());
        let kick = Arc::new(Notify::new());

        {
            let received = Arc::clone(&received);
            let accepted = Arc::clone(&accepted);
            let shutdown = Arc::clone(&shutdown);
            let kick = Arc::clone(&kick);

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            match result {
                                Ok((stream, _)) => {
                                    *accepted.lock() += 1;
                                    let received = Arc::clone(&received);
                                    let shutdown = Arc::clone(&shutdown);
                                    let kick = Arc::clone(&kick);
                                    tokio::spawn(async move {
                                        Self::handle_connection(stream, received, shutdown, kick).await;
                                    });
                                }
                                Err(e) => {
                                    eprintln!("Accept error: {}", e);
                                    break;
                                }
                            }
                        }
                        _ = shutdown.notified() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            addr,
            received,
            accepted,
            shutdown,
            kick,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        received: Arc<Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
        kick: Arc<Notify>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let hello = r#"{"type":"connection-established","payload":{}}"#;
        if write.send(Message::Text(hello.to_string())).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            received.lock().push(text.clone());
                            if let Ok(msg) = WireMessage::from_json(&text) {
                                if msg.kind == "job-progress-listen" {
                                    let reply = serde_json::json!({
                                        "type": "job-progress",
                                        "payload": { "id": msg.payload["id"], "percent": 50 }
                                    });
                                    if write.send(Message::Text(reply.to_string())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = kick.notified() => {
                    let _ = write.close().await;
                    break;
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Text frames received so far, across all connections
    pub fn received(&self) -> Vec<WireMessage> {
        self.received
            .lock()
            .iter()
            .filter_map(|text| WireMessage::from_json(text).ok())
            .collect()
    }

    pub fn accepted(&self) -> usize {
        *self.accepted.lock()
    }

    /// Close every open connection from the server side
    pub fn kick_all(&self) {
        self.kick.notify_waiters();
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` expires
pub async fn wait_until<F>(timeout: std::time::Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
