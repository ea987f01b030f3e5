//! Production transport on top of tokio-tungstenite
//!
//! Each connection is one Tokio task owning the socket. The handle returned
//! to the manager only holds the shared state cell and the outbound queue,
//! so sends never block and never touch the socket directly.
//!
//! ```text
//! manager ──send()──▶ unbounded queue ──▶ I/O task ──▶ WebSocket
//!    ▲                                       │
//!    └──────────── TransportEvents ◀─────────┘
//! ```

use crate::core::state::{AtomicConnectionState, ConnectionState};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Commands from the transport handle to its I/O task
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Opens real WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn connect(&self, request: &ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        {
            let request = request.clone();
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                run_connection(request, state, outbound_rx, events).await;
            });
        }

        Box::new(TungsteniteTransport { state, outbound_tx })
    }
}

/// Handle to one tungstenite connection
///
/// Dropping the handle closes the socket.
pub struct TungsteniteTransport {
    state: Arc<AtomicConnectionState>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl Transport for TungsteniteTransport {
    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn send(&self, text: String) -> Result<()> {
        if !self.state.is_open() {
            return Err(SocketError::ConnectionClosed("transport not open".into()));
        }
        self.outbound_tx
            .send(Outbound::Frame(text))
            .map_err(|_| SocketError::ConnectionClosed("I/O task gone".into()))
    }

    fn close(&self) {
        self.state.set(ConnectionState::Closed);
        let _ = self.outbound_tx.send(Outbound::Close);
    }
}

/// Build the handshake request, embedding the sub-protocol if a token exists
pub(crate) async fn build_request(request: &ConnectRequest) -> Result<Request> {
    let mut ws_request = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| SocketError::WebSocket(format!("Failed to create request: {}", e)))?;

    if let Some(protocol) = request.subprotocol().await? {
        let value = protocol
            .parse::<http::header::HeaderValue>()
            .map_err(|_| SocketError::Credentials("token is not a valid header value".into()))?;
        ws_request
            .headers_mut()
            .insert(http::header::SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(ws_request)
}

/// Connection task: handshake, then pump frames both ways until either side stops
async fn run_connection(
    request: ConnectRequest,
    state: Arc<AtomicConnectionState>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    events: TransportEvents,
) {
    let generation = events.generation();

    let ws_request = match build_request(&request).await {
        Ok(ws_request) => ws_request,
        Err(e) => {
            state.set(ConnectionState::Closed);
            events.emit(TransportEvent::Error(e.to_string()));
            events.emit(TransportEvent::Closed);
            return;
        }
    };

    let ws_stream = match connect_async(ws_request).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            state.set(ConnectionState::Closed);
            events.emit(TransportEvent::Error(format!("Failed to connect: {}", e)));
            events.emit(TransportEvent::Closed);
            return;
        }
    };

    // close() may have won the race against the handshake
    if state
        .compare_exchange(ConnectionState::Connecting, ConnectionState::Open)
        .is_err()
    {
        debug!("Connection #{} closed during handshake", generation);
        let mut ws_stream = ws_stream;
        let _ = ws_stream.close(None).await;
        return;
    }

    info!("Connected to {} (#{})", request.url, generation);
    events.emit(TransportEvent::Established);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(msg)) => {
                        if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                            if !events.emit(TransportEvent::Message(ws_msg)) {
                                debug!("Connection #{} owner dropped", generation);
                                let _ = write.close().await;
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        events.emit(TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        warn!("WebSocket stream closed (#{})", generation);
                        break;
                    }
                }
            }

            cmd = outbound_rx.recv() => {
                match cmd {
                    Some(Outbound::Frame(text)) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            events.emit(TransportEvent::Error(format!("Failed to send: {}", e)));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!("Closing connection #{}", generation);
                        let _ = write.close().await;
                        break;
                    }
                }
            }
        }
    }

    state.set(ConnectionState::Closed);
    events.emit(TransportEvent::Closed);
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{NoCredentials, StaticToken};

    fn request(credentials: Arc<dyn CredentialProvider>) -> ConnectRequest {
        ConnectRequest {
            url: "ws://127.0.0.1:9047/apiv2/socket".into(),
            subprotocol_prefix: "_dremio".into(),
            credentials,
        }
    }

    #[tokio::test]
    async fn test_request_carries_subprotocol() {
        let ws_request = build_request(&request(Arc::new(StaticToken::new("tok"))))
            .await
            .unwrap();
        assert_eq!(
            ws_request.headers().get(http::header::SEC_WEBSOCKET_PROTOCOL).unwrap(),
            "_dremiotok"
        );
    }

    #[tokio::test]
    async fn test_request_without_token_has_no_subprotocol() {
        let ws_request = build_request(&request(Arc::new(NoCredentials))).await.unwrap();
        assert!(ws_request
            .headers()
            .get(http::header::SEC_WEBSOCKET_PROTOCOL)
            .is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let result = build_request(&request(Arc::new(StaticToken::new("bad\ntoken")))).await;
        assert!(matches!(result, Err(SocketError::Credentials(_))));
    }

    #[test]
    fn test_control_frames_are_not_forwarded() {
        assert!(tungstenite_to_ws_message(Message::Ping(vec![1])).is_none());
        assert!(tungstenite_to_ws_message(Message::Close(None)).is_none());
        assert_eq!(
            tungstenite_to_ws_message(Message::Text("hi".into())),
            Some(WsMessage::Text("hi".into()))
        );
    }
}
