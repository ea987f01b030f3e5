//! # Jobsockets Manager
//!
//! The connection manager: one connection, many reference-counted
//! subscriptions, heartbeat and liveness-driven reconnects.

pub mod manager;

pub use manager::ConnectionManager;
pub use crate::core::*;
pub use crate::traits::*;
