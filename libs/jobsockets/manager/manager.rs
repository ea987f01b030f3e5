use crate::core::heartbeat::{spawn_ticker, Ticker};
use crate::core::message::{self, Fact, Topic, WireMessage};
use crate::core::registry::{Acquired, Released, SubscriptionRegistry};
use crate::core::{AtomicMetrics, ConnectionState, ManagerConfig, Metrics, UnsubscribeWire};
use crate::traits::*;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Heartbeat and liveness poll of one open/close cycle
struct Timers {
    heartbeat: Ticker,
    liveness: Ticker,
}

impl Timers {
    fn cancel(mut self) {
        self.heartbeat.cancel();
        self.liveness.cancel();
    }
}

/// Everything guarded by the manager lock
struct Inner {
    sink: Option<Arc<dyn DispatchSink>>,
    credentials: Arc<dyn CredentialProvider>,
    /// Current connection; replaced wholesale on reconnect
    transport: Option<Box<dyn Transport>>,
    /// `Established` seen for the current connection; sends wait for it
    established: bool,
    /// Bumped on every new connection; events tagged with an older value are stale
    generation: u64,
    /// Bumped on every open/close; ticks from an older cycle are ignored
    epoch: u64,
    registry: SubscriptionRegistry,
    timers: Option<Timers>,
}

impl Inner {
    #[inline]
    fn is_open(&self) -> bool {
        self.timers.is_some()
    }
}

struct Shared {
    config: ManagerConfig,
    connector: Box<dyn Connector>,
    metrics: AtomicMetrics,
    inner: Mutex<Inner>,
    weak_self: Weak<Shared>,
}

/// Single-connection real-time client with reference-counted subscriptions
///
/// Owns at most one transport connection, a registry of active subscriptions
/// and two timers: a heartbeat that keeps intermediaries from idling the
/// connection out, and a liveness poll that reconnects once the transport
/// reports `Closed`. Every reconnect replays all active subscriptions.
///
/// All state sits behind one mutex, so caller operations, timer ticks and
/// transport events are serialized. The handle is cheap to clone; clones
/// share the same connection.
///
/// # Example
/// ```ignore
/// let manager = ConnectionManager::new(
///     ManagerConfig::new("wss://host/apiv2/socket"),
///     TungsteniteConnector::new(),
/// );
/// manager.set_credentials(EnvToken::new("JOB_WATCH_TOKEN"));
/// manager.set_dispatch(|fact: Fact| println!("{}: {}", fact.kind, fact.payload));
/// manager.open()?;
///
/// manager.subscribe_job_progress("1f3a-...", false)?;
/// // ...
/// manager.unsubscribe_job_progress("1f3a-...")?;
/// manager.close();
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a closed manager
    ///
    /// Nothing connects until [`open`](Self::open). Credentials default to
    /// [`NoCredentials`].
    pub fn new<C>(config: ManagerConfig, connector: C) -> Self
    where
        C: Connector,
    {
        let shared = Arc::new_cyclic(|weak_self| Shared {
            config,
            connector: Box::new(connector),
            metrics: AtomicMetrics::new(),
            inner: Mutex::new(Inner {
                sink: None,
                credentials: Arc::new(NoCredentials),
                transport: None,
                established: false,
                generation: 0,
                epoch: 0,
                registry: SubscriptionRegistry::new(),
                timers: None,
            }),
            weak_self: Weak::clone(weak_self),
        });

        Self { shared }
    }

    /// Assign the sink that receives every parsed inbound frame
    ///
    /// Must happen before [`open`](Self::open); may be replaced later.
    pub fn set_dispatch<S>(&self, sink: S)
    where
        S: DispatchSink,
    {
        self.shared.inner.lock().sink = Some(Arc::new(sink));
    }

    /// Assign the provider of the access token embedded at connect time
    ///
    /// The token is read on every (re)connect. Rotating credentials on a
    /// live connection has no effect until the next connect; close and
    /// reopen to force one.
    pub fn set_credentials<P>(&self, provider: P)
    where
        P: CredentialProvider + 'static,
    {
        self.shared.inner.lock().credentials = Arc::new(provider);
    }

    /// Connect and start the heartbeat and liveness timers
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// * [`SocketError::AlreadyOpen`] - the manager is already open
    /// * [`SocketError::MissingDispatch`] - no sink assigned yet
    /// * [`SocketError::Configuration`] - the config fails validation
    pub fn open(&self) -> Result<()> {
        let shared = &self.shared;
        shared.config.validate()?;
        let mut inner = shared.inner.lock();

        if inner.is_open() {
            return Err(SocketError::AlreadyOpen);
        }
        if inner.sink.is_none() {
            return Err(SocketError::MissingDispatch);
        }

        inner.epoch += 1;
        let epoch = inner.epoch;

        shared.create_connection(&mut inner);

        let heartbeat = {
            let weak = Weak::clone(&shared.weak_self);
            spawn_ticker("heartbeat", shared.config.ping_interval(), move || {
                weak.upgrade().is_some_and(|shared| shared.heartbeat_tick(epoch))
            })
        };
        let liveness = {
            let weak = Weak::clone(&shared.weak_self);
            spawn_ticker("liveness", shared.config.check_interval(), move || {
                weak.upgrade().is_some_and(|shared| shared.liveness_tick(epoch))
            })
        };
        inner.timers = Some(Timers { heartbeat, liveness });

        info!(
            "Socket opened: {} (ping every {:?}, check every {:?})",
            shared.config.url,
            shared.config.ping_interval(),
            shared.config.check_interval()
        );
        Ok(())
    }

    /// Close the connection, cancel both timers and clear all subscriptions
    ///
    /// Safe to call any number of times, open or not.
    pub fn close(&self) {
        let (transport, timers) = {
            let mut inner = self.shared.inner.lock();
            inner.epoch += 1;
            inner.registry.clear();
            inner.established = false;
            (inner.transport.take(), inner.timers.take())
        };

        if let Some(timers) = timers {
            timers.cancel();
            info!("Socket closed");
        }
        if let Some(transport) = transport {
            transport.close();
        }
    }

    /// Liveness poll: reconnect if the transport reports `Closed`
    ///
    /// Runs every `check_interval` while open. No-op while connected,
    /// connecting, or while the manager itself is closed.
    ///
    /// Returns `true` if a new connection attempt was started.
    pub fn check_connection(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        self.shared.check_locked(&mut inner)
    }

    /// Heartbeat: send `{"type":"ping","payload":{}}`
    ///
    /// Runs every `ping_interval` while open. Dropped silently when not
    /// connected.
    pub fn ping(&self) {
        let inner = self.shared.inner.lock();
        self.shared.send_message(&inner, &WireMessage::ping());
    }

    /// Take a reference on `(topic, id)`
    ///
    /// The listen message goes on the wire for the first reference only,
    /// or again when `force_resend` is set. When not connected the send is
    /// dropped but the reference is kept, and the next connect replays it.
    ///
    /// # Errors
    /// * [`SocketError::EmptyId`] - `id` is empty
    pub fn subscribe(&self, topic: &Topic, id: &str, force_resend: bool) -> Result<()> {
        ensure_id(topic, id)?;
        let message = WireMessage::listen(topic, id);
        let key = topic.key(id);

        let mut inner = self.shared.inner.lock();
        match inner.registry.acquire(key.clone(), message.clone()) {
            Acquired::First => {
                debug!("Subscribed {}", key);
                self.shared.send_message(&inner, &message);
            }
            Acquired::Shared { ref_count } => {
                debug!("Subscribed {} (refs: {})", key, ref_count);
                if force_resend {
                    self.shared.send_message(&inner, &message);
                }
            }
        }
        Ok(())
    }

    /// Drop a reference on `(topic, id)`
    ///
    /// Releasing the last reference removes the entry and sends the
    /// unsubscribe message. Unknown subscriptions are ignored.
    ///
    /// # Errors
    /// * [`SocketError::EmptyId`] - `id` is empty
    pub fn unsubscribe(&self, topic: &Topic, id: &str) -> Result<()> {
        ensure_id(topic, id)?;
        let key = topic.key(id);

        let mut inner = self.shared.inner.lock();
        match inner.registry.release(&key) {
            Released::Missing => {
                debug!("Unsubscribe for unknown {}, ignoring", key);
            }
            Released::Shared { ref_count } => {
                debug!("Unsubscribed {} (refs: {})", key, ref_count);
            }
            Released::Removed(message) => {
                debug!("Unsubscribed {} (last reference)", key);
                if self.shared.config.unsubscribe_wire == UnsubscribeWire::ResendListen {
                    self.shared.send_message(&inner, &message);
                }
            }
        }
        Ok(())
    }

    pub fn subscribe_job_details(&self, job_id: &str, force_resend: bool) -> Result<()> {
        self.subscribe(&Topic::JobDetails, job_id, force_resend)
    }

    pub fn unsubscribe_job_details(&self, job_id: &str) -> Result<()> {
        self.unsubscribe(&Topic::JobDetails, job_id)
    }

    pub fn subscribe_job_progress(&self, job_id: &str, force_resend: bool) -> Result<()> {
        self.subscribe(&Topic::JobProgress, job_id, force_resend)
    }

    pub fn unsubscribe_job_progress(&self, job_id: &str) -> Result<()> {
        self.unsubscribe(&Topic::JobProgress, job_id)
    }

    /// Whether `open` has been called without a matching `close`
    pub fn is_open(&self) -> bool {
        self.shared.inner.lock().is_open()
    }

    /// State of the current connection, `Closed` when there is none
    pub fn connection_state(&self) -> ConnectionState {
        self.shared
            .inner
            .lock()
            .transport
            .as_ref()
            .map_or(ConnectionState::Closed, |t| t.state())
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Open
    }

    /// Number of distinct active subscriptions
    pub fn subscription_count(&self) -> usize {
        self.shared.inner.lock().registry.len()
    }

    /// Current reference count of `(topic, id)`; 0 when absent
    pub fn ref_count(&self, topic: &Topic, id: &str) -> usize {
        self.shared.inner.lock().registry.ref_count(&topic.key(id))
    }

    pub fn metrics(&self) -> Metrics {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }
}

fn ensure_id(topic: &Topic, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(SocketError::EmptyId {
            topic: topic.to_string(),
        });
    }
    Ok(())
}

impl Shared {
    /// Replace the current connection with a fresh one
    fn create_connection(&self, inner: &mut Inner) {
        if let Some(old) = inner.transport.take() {
            old.close();
        }

        inner.established = false;
        inner.generation += 1;
        let handler: Weak<dyn TransportEventHandler> = self.weak_self.clone();
        let events = TransportEvents::new(inner.generation, handler);
        let request = ConnectRequest {
            url: self.config.url.clone(),
            subprotocol_prefix: self.config.subprotocol_prefix.clone(),
            credentials: Arc::clone(&inner.credentials),
        };

        debug!("Connecting to {} (#{})", self.config.url, inner.generation);
        inner.transport = Some(self.connector.connect(&request, events));
    }

    fn check_locked(&self, inner: &mut Inner) -> bool {
        if !inner.is_open() {
            return false;
        }

        let closed = inner
            .transport
            .as_ref()
            .map_or(true, |t| t.state() == ConnectionState::Closed);
        if !closed {
            return false;
        }

        info!("Connection closed, reconnecting");
        self.metrics.increment_reconnects();
        self.create_connection(inner);
        true
    }

    /// Send if connected, otherwise drop
    ///
    /// A transport already `Open` whose `Established` event is still in
    /// flight counts as not connected: the replay covers that window.
    ///
    /// Returns whether the frame was handed to the transport.
    fn send_message(&self, inner: &Inner, message: &WireMessage) -> bool {
        let transport = match inner.transport.as_ref() {
            Some(t) if inner.established && t.state() == ConnectionState::Open => t,
            _ => {
                debug!("Not connected, dropping '{}'", message.kind);
                self.metrics.increment_dropped();
                return false;
            }
        };

        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize '{}': {}", message.kind, e);
                return false;
            }
        };

        match transport.send(text) {
            Ok(()) => {
                self.metrics.increment_sent();
                true
            }
            Err(e) => {
                debug!("Dropping '{}': {}", message.kind, e);
                self.metrics.increment_dropped();
                false
            }
        }
    }

    fn heartbeat_tick(&self, epoch: u64) -> bool {
        let inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        self.send_message(&inner, &WireMessage::ping());
        true
    }

    fn liveness_tick(&self, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return false;
        }
        self.check_locked(&mut inner);
        true
    }

    /// Resend every active subscription once
    fn replay(&self, inner: &Inner) {
        let mut sent = 0;
        for message in inner.registry.messages() {
            if self.send_message(inner, message) {
                sent += 1;
            }
        }
        info!("Replayed {}/{} subscriptions", sent, inner.registry.len());
    }

    /// Parse an inbound frame; malformed frames are logged and dropped
    fn parse_frame(&self, frame: &WsMessage) -> Option<Fact> {
        let Some(text) = frame.to_text() else {
            error!("Socket message handling error: binary frame is not UTF-8");
            self.metrics.increment_malformed();
            return None;
        };

        match WireMessage::from_json(text) {
            Ok(msg) => {
                if msg.kind == message::CONNECTION_ESTABLISHED {
                    info!("Socket handshake acknowledged");
                } else {
                    debug!(kind = %msg.kind, "Inbound message");
                }
                Some(Fact::from(msg))
            }
            Err(e) => {
                error!(error = %e, "Socket message handling error, dropping frame");
                self.metrics.increment_malformed();
                None
            }
        }
    }
}

impl TransportEventHandler for Shared {
    fn on_transport_event(&self, generation: u64, event: TransportEvent) {
        let dispatch = {
            let mut inner = self.inner.lock();
            if inner.transport.is_none() || generation != inner.generation {
                debug!("Ignoring event from stale connection #{}", generation);
                return;
            }

            match event {
                TransportEvent::Established => {
                    info!("Socket connected (#{})", generation);
                    inner.established = true;
                    self.replay(&inner);
                    None
                }
                TransportEvent::Error(e) => {
                    error!("Socket connection error: {}", e);
                    None
                }
                TransportEvent::Closed => {
                    warn!("Socket connection #{} closed", generation);
                    inner.established = false;
                    None
                }
                TransportEvent::Message(frame) => {
                    self.metrics.increment_received();
                    match (self.parse_frame(&frame), inner.sink.as_ref()) {
                        (Some(fact), Some(sink)) => Some((Arc::clone(sink), fact)),
                        _ => None,
                    }
                }
            }
        };

        // Outside the lock: the sink may call back into the manager
        if let Some((sink, fact)) = dispatch {
            sink.dispatch(fact);
        }
    }
}
