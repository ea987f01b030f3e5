//! Connection state and counters
//!
//! Both are plain atomics so transports can update them from their I/O task
//! while the manager reads them under its own lock.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// State of one transport connection
///
/// ```text
///            connect()            handshake ok
///  Closed ─────────────▶ Connecting ─────────────▶ Open
///    ▲                       │                      │
///    └───────────────────────┴──────────────────────┘
///          handshake failed / stream ended / close()
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Closed = 0,
    Connecting = 1,
    Open = 2,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Lock-free connection state cell
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Move from `current` to `new` only if still in `current`
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.inner
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }
}

/// Snapshot of manager counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub dropped_sends: u64,
    pub malformed_frames: u64,
}

/// Atomic counters behind [`Metrics`]
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
    dropped_sends: AtomicU64,
    malformed_frames: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_dropped(&self) {
        self.dropped_sends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Metrics {
        Metrics {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            reconnect_count: self.reconnect_count.load(Ordering::Relaxed),
            dropped_sends: self.dropped_sends.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let state = AtomicConnectionState::new(ConnectionState::Closed);
        assert!(state.is_closed());

        state.set(ConnectionState::Connecting);
        assert_eq!(state.get(), ConnectionState::Connecting);
        assert!(!state.is_open());

        assert_eq!(
            state.compare_exchange(ConnectionState::Connecting, ConnectionState::Open),
            Ok(ConnectionState::Connecting)
        );
        assert!(state.is_open());

        // Stale transition is rejected
        assert_eq!(
            state.compare_exchange(ConnectionState::Connecting, ConnectionState::Closed),
            Err(ConnectionState::Open)
        );
        assert!(state.is_open());
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = AtomicMetrics::new();
        metrics.increment_sent();
        metrics.increment_sent();
        metrics.increment_dropped();
        metrics.increment_malformed();
        metrics.increment_reconnects();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.messages_received, 0);
        assert_eq!(snapshot.dropped_sends, 1);
        assert_eq!(snapshot.malformed_frames, 1);
        assert_eq!(snapshot.reconnect_count, 1);
    }
}
