//! # Jobsockets
//!
//! A resilient single-connection WebSocket client that multiplexes many
//! logical subscriptions over one transport.
//!
//! ## Features
//!
//! - **Reference-counted subscriptions**: wire traffic only on the first
//!   subscribe and the last unsubscribe of a `(topic, id)`
//! - **Replay on reconnect**: every active subscription is resent once per
//!   new connection
//! - **Liveness poll**: a closed transport is replaced within one check interval
//! - **Heartbeat**: a periodic `ping` keeps proxies from idling the connection out
//! - **Injectable transport**: production uses tokio-tungstenite, tests plug in fakes

pub mod traits;
pub mod core;
pub mod manager;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    config, heartbeat, message, registry, state,
    config::{ManagerConfig, UnsubscribeWire},
    message::{Fact, Topic, WireMessage},
    state::{ConnectionState, Metrics},
    tungstenite::{TungsteniteConnector, TungsteniteTransport},
};

// Re-export manager
pub use manager::ConnectionManager;
