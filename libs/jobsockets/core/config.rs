use crate::error::{Result, SocketError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default heartbeat period
pub const DEFAULT_PING_INTERVAL_MS: u64 = 15_000;
/// Default liveness poll period
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 5_000;
/// Default sub-protocol prefix placed in front of the access token
pub const DEFAULT_SUBPROTOCOL_PREFIX: &str = "_dremio";

/// What goes on the wire when the last reference to a subscription is released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeWire {
    /// Resend the stored `*-listen` message
    #[default]
    ResendListen,
    /// Nothing; the release is local bookkeeping only
    Silent,
}

/// Configuration for a [`ConnectionManager`](crate::manager::ConnectionManager)
///
/// Deserializable from YAML/JSON with millisecond fields; every field except
/// `url` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// WebSocket URL (wss:// or ws://)
    pub url: String,

    /// Heartbeat period in milliseconds
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Liveness poll period in milliseconds; also the worst-case reconnect latency
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Prefix of the `Sec-WebSocket-Protocol` value
    #[serde(default = "default_subprotocol_prefix")]
    pub subprotocol_prefix: String,

    #[serde(default)]
    pub unsubscribe_wire: UnsubscribeWire,
}

fn default_ping_interval_ms() -> u64 {
    DEFAULT_PING_INTERVAL_MS
}

fn default_check_interval_ms() -> u64 {
    DEFAULT_CHECK_INTERVAL_MS
}

fn default_subprotocol_prefix() -> String {
    DEFAULT_SUBPROTOCOL_PREFIX.to_string()
}

/// Sub-millisecond durations round up to 1 ms; only zero stays zero
fn ceil_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

impl ManagerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            subprotocol_prefix: default_subprotocol_prefix(),
            unsubscribe_wire: UnsubscribeWire::default(),
        }
    }

    /// Set heartbeat interval, rounded up to whole milliseconds
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval_ms = ceil_millis(interval);
        self
    }

    /// Set liveness poll interval, rounded up to whole milliseconds
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_ms = ceil_millis(interval);
        self
    }

    pub fn with_subprotocol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subprotocol_prefix = prefix.into();
        self
    }

    pub fn with_unsubscribe_wire(mut self, mode: UnsubscribeWire) -> Self {
        self.unsubscribe_wire = mode;
        self
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Reject values that would make the timers spin or the connect fail
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(SocketError::Configuration("url must not be empty".into()));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(SocketError::Configuration(format!(
                "url must use ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.ping_interval_ms == 0 {
            return Err(SocketError::Configuration(
                "ping_interval_ms must be greater than 0".into(),
            ));
        }
        if self.check_interval_ms == 0 {
            return Err(SocketError::Configuration(
                "check_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::new("ws://localhost:9047/apiv2/socket");
        assert_eq!(config.ping_interval(), Duration::from_secs(15));
        assert_eq!(config.check_interval(), Duration::from_secs(5));
        assert_eq!(config.subprotocol_prefix, "_dremio");
        assert_eq!(config.unsubscribe_wire, UnsubscribeWire::ResendListen);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_with_defaults() {
        let config: ManagerConfig = serde_yaml::from_str(
            "url: wss://example.com/socket\ncheck_interval_ms: 1000\nunsubscribe_wire: silent\n",
        )
        .unwrap();

        assert_eq!(config.url, "wss://example.com/socket");
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert_eq!(config.ping_interval_ms, DEFAULT_PING_INTERVAL_MS);
        assert_eq!(config.unsubscribe_wire, UnsubscribeWire::Silent);
    }

    #[test]
    fn test_validation() {
        assert!(ManagerConfig::new("").validate().is_err());
        assert!(ManagerConfig::new("http://example.com").validate().is_err());
        assert!(ManagerConfig::new("ws://example.com")
            .with_ping_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ManagerConfig::new("ws://example.com")
            .with_check_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_sub_millisecond_intervals_round_up() {
        let config = ManagerConfig::new("ws://example.com")
            .with_check_interval(Duration::from_micros(500))
            .with_ping_interval(Duration::from_micros(1_001));

        assert_eq!(config.check_interval_ms, 1);
        assert_eq!(config.ping_interval_ms, 2);
        assert!(config.validate().is_ok());
    }
}
