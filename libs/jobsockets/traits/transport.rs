use crate::core::state::ConnectionState;
use crate::credentials::CredentialProvider;
use crate::error::Result;
use std::sync::{Arc, Weak};

/// Raw WebSocket frame payload
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    /// Borrow the frame as UTF-8 text, decoding binary frames if possible
    pub fn to_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(b) => std::str::from_utf8(b).ok(),
        }
    }
}

/// Events a transport reports back to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake finished, the transport is now `Open`
    Established,
    /// Transport-level fault (logged by the owner, never fatal)
    Error(String),
    /// Inbound application frame
    Message(WsMessage),
    /// The transport reached `Closed`
    Closed,
}

/// Receiver side of transport events
///
/// Implemented by the connection manager. `generation` identifies which
/// connection the event belongs to so events from a replaced handle can be
/// discarded.
pub trait TransportEventHandler: Send + Sync + 'static {
    fn on_transport_event(&self, generation: u64, event: TransportEvent);
}

/// Handle given to a transport for reporting its events
///
/// Holds only a weak reference to the owner: a transport task that outlives
/// its manager simply stops delivering.
#[derive(Clone)]
pub struct TransportEvents {
    generation: u64,
    handler: Weak<dyn TransportEventHandler>,
}

impl TransportEvents {
    pub fn new(generation: u64, handler: Weak<dyn TransportEventHandler>) -> Self {
        Self { generation, handler }
    }

    /// Connection generation this handle reports for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event to the owner
    ///
    /// Returns `false` once the owner has been dropped.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.handler.upgrade() {
            Some(handler) => {
                handler.on_transport_event(self.generation, event);
                true
            }
            None => false,
        }
    }
}

/// Everything a connector needs to open one connection
#[derive(Clone)]
pub struct ConnectRequest {
    /// WebSocket URL (wss:// or ws://)
    pub url: String,
    /// Prefix glued in front of the access token to form the sub-protocol
    pub subprotocol_prefix: String,
    /// Source of the access token, queried on every connect
    pub credentials: Arc<dyn CredentialProvider>,
}

impl ConnectRequest {
    /// Resolve the `Sec-WebSocket-Protocol` value for this attempt
    ///
    /// Returns `None` when no token is available, in which case no
    /// sub-protocol is requested.
    pub async fn subprotocol(&self) -> Result<Option<String>> {
        let token = self.credentials.access_token().await?;
        Ok(token.map(|token| format!("{}{}", self.subprotocol_prefix, token)))
    }
}

/// A live duplex connection
///
/// Sends are fire-and-forget. Implementations must never block.
pub trait Transport: Send + Sync {
    /// Current state of this connection
    fn state(&self) -> ConnectionState;

    /// Queue a text frame for sending
    fn send(&self, text: String) -> Result<()>;

    /// Begin closing the connection. Safe to call more than once.
    fn close(&self);
}

/// Factory for transports
///
/// `connect` must return immediately with a handle in the `Connecting`
/// state. Events are delivered later from the transport's own task and
/// must never be emitted synchronously from inside `connect`.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, request: &ConnectRequest, events: TransportEvents) -> Box<dyn Transport>;
}
