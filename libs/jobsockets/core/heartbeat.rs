//! Periodic timers for the connection manager
//!
//! # Architecture
//!
//! Heartbeat and liveness poll are both a [`Ticker`]: a dedicated Tokio task
//! that calls back into the manager on every interval.
//!
//! ```text
//! ┌─────────────────────┐
//! │  Ticker Task        │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every X interval:  │
//! │  1. Wait for tick   │
//! │  2. on_tick() ──────┼──> ConnectionManager::ping / check_connection
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The first tick fires one full interval after spawning. Missed ticks are
//! skipped, never bursted. The task stops when cancelled, when the ticker is
//! dropped, or when `on_tick` returns `false`.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a running periodic task
pub struct Ticker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Ticker {
    /// Stop the task; no tick starts after this returns
    ///
    /// A tick already running completes. Callers that need a hard
    /// guarantee pair this with their own epoch check inside `on_tick`.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("{} ticker cancelled", self.name);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn a periodic task
///
/// Must be called from within a Tokio runtime.
///
/// # Arguments
/// * `name` - Label used in logs
/// * `interval` - Duration between ticks
/// * `on_tick` - Called on every tick; return `false` to stop
pub fn spawn_ticker<F>(name: &'static str, interval: Duration, mut on_tick: F) -> Ticker
where
    F: FnMut() -> bool + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick - wait for the first interval
        ticker.tick().await;
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        debug!("{} ticker started with interval: {:?}", name, interval);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("{} ticker received shutdown signal", name);
                    break;
                }
                _ = ticker.tick() => {
                    if !on_tick() {
                        debug!("{} ticker owner gone, stopping", name);
                        break;
                    }
                }
            }
        }

        debug!("{} ticker exiting", name);
    });

    Ticker {
        name,
        handle: Some(handle),
        shutdown_tx: Some(shutdown_tx),
    }
}
