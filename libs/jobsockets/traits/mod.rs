//! # Jobsockets Traits
//!
//! Seams of the jobsockets client:
//!
//! - **Transport / Connector**: the duplex connection and how to open one
//! - **DispatchSink**: where parsed inbound facts go
//! - **CredentialProvider**: the access token embedded at connect time
//! - **SocketError**: the error type shared by all of the above
//!
//! ## Example
//!
//! ```rust,ignore
//! use jobsockets::traits::*;
//!
//! // Inject a custom transport, e.g. for tests
//! struct MyConnector;
//!
//! impl Connector for MyConnector {
//!     fn connect(&self, request: &ConnectRequest, events: TransportEvents) -> Box<dyn Transport> {
//!         // Open the connection, report through `events`
//!         todo!()
//!     }
//! }
//! ```

pub mod credentials;
pub mod error;
pub mod sink;
pub mod transport;

// Re-export commonly used types
pub use credentials::{CredentialProvider, EnvToken, NoCredentials, StaticToken};
pub use error::{Result, SocketError};
pub use sink::{ChannelSink, DispatchSink};
pub use transport::{
    ConnectRequest, Connector, Transport, TransportEvent, TransportEventHandler, TransportEvents,
    WsMessage,
};
