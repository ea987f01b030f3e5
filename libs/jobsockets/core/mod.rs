//! # Jobsockets Core
//!
//! Building blocks of the connection manager:
//!
//! - **config**: intervals, URL, sub-protocol prefix
//! - **state**: `{Closed, Connecting, Open}` plus atomic counters
//! - **message**: the `{type, payload}` envelope, topics and facts
//! - **registry**: reference-counted subscriptions
//! - **heartbeat**: periodic tickers for heartbeat and liveness poll
//! - **tungstenite**: the production transport
//!
//! ## Example
//!
//! ```rust,ignore
//! use jobsockets::core::*;
//! use jobsockets::ConnectionManager;
//!
//! let config = ManagerConfig::new("wss://host/apiv2/socket")
//!     .with_check_interval(Duration::from_secs(5));
//! let manager = ConnectionManager::new(config, TungsteniteConnector::new());
//! ```

pub mod config;
pub mod heartbeat;
pub mod message;
pub mod registry;
pub mod state;
pub mod tungstenite;

// Re-export main types
pub use config::{ManagerConfig, UnsubscribeWire};
pub use heartbeat::{spawn_ticker, Ticker};
pub use message::{Fact, Topic, WireMessage};
pub use registry::{Acquired, Released, SubscriptionRegistry};
pub use state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use tungstenite::{TungsteniteConnector, TungsteniteTransport};

// Re-export traits for convenience
pub use crate::traits::*;
