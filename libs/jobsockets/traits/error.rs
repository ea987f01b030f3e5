use thiserror::Error;

/// Main error type for jobsockets
///
/// The first three variants are caller contract violations and are returned
/// straight from the offending call. Everything else describes transport or
/// configuration faults.
#[derive(Error, Debug)]
pub enum SocketError {
    /// `open()` called while the manager is already open
    #[error("socket already open")]
    AlreadyOpen,

    /// `open()` called before a dispatch sink was assigned
    #[error("socket requires a dispatch sink to be assigned before open")]
    MissingDispatch,

    /// Subscribe/unsubscribe called without an id
    #[error("must provide an id for topic '{topic}'")]
    EmptyId { topic: String },

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Credential lookup failed
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Message parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for SocketError {
    fn from(err: serde_json::Error) -> Self {
        SocketError::ParseError(err.to_string())
    }
}

/// Result type for jobsockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
