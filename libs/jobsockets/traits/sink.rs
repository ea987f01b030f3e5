//! Dispatch sinks
//!
//! Every successfully parsed inbound frame is handed to exactly one sink as a
//! normalized [`Fact`]. The manager never inspects what the sink does with it.
//!
//! ```text
//! WebSocket → parse {type, payload} → Fact {kind, payload} → DispatchSink
//!                  ↓ (malformed)
//!              log + drop
//! ```
//!
//! The sink is called outside the manager's lock, so it may call back into
//! the manager (for example to subscribe to a job it just learned about).

use crate::core::message::Fact;
use crossbeam_channel::Sender;
use tracing::debug;

/// Receiver of dispatched facts
///
/// # Example
///
/// ```ignore
/// manager.set_dispatch(|fact: Fact| {
///     if fact.kind == "job-progress" {
///         println!("progress: {}", fact.payload);
///     }
/// });
/// ```
pub trait DispatchSink: Send + Sync + 'static {
    /// Handle one fact
    ///
    /// This runs on whichever task delivered the frame. Keep it short;
    /// hand heavy work to a channel (see [`ChannelSink`]).
    fn dispatch(&self, fact: Fact);
}

impl<F> DispatchSink for F
where
    F: Fn(Fact) + Send + Sync + 'static,
{
    fn dispatch(&self, fact: Fact) {
        self(fact)
    }
}

/// Sink that forwards facts onto a crossbeam channel
///
/// The receiving side can live on a dedicated thread, the same way message
/// handlers consume routed messages.
#[derive(Clone)]
pub struct ChannelSink {
    tx: Sender<Fact>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Fact>) -> Self {
        Self { tx }
    }

    /// Create a sink together with an unbounded receiver
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<Fact>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl DispatchSink for ChannelSink {
    fn dispatch(&self, fact: Fact) {
        // Receiver gone only during shutdown
        if self.tx.send(fact).is_err() {
            debug!("Dispatch channel closed, dropping fact");
        }
    }
}
