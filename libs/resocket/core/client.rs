use crate::buffer::MessageBuffer;
use crate::builder::{states::NoUrl, ConnectionBuilder};
use crate::config::SocketConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::listeners::{dispatch, Event, EventKind, Listener, ListenerRegistry};
use crate::traits::*;
use crate::transport::WsConnector;
use parking_lot::{Mutex, RwLock};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

/// Internal command messages for the driver task
#[derive(Debug)]
enum ClientCommand {
    /// Write a payload to the live transport
    Send(Payload),
    /// Flush the buffer now (sent by `resume`)
    Flush,
    /// Wake the driver so it notices the Destroyed state
    Destroy,
}

/// Client metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_evicted: u64,
    pub reconnect_attempts: u64,
    pub buffered: usize,
    pub connection_state: ConnectionState,
}

/// State visible to both handles and the driver task
#[derive(Debug)]
struct Shared {
    id: String,
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    paused: AtomicBool,
    listeners: RwLock<ListenerRegistry>,
}

/// Reconnecting, buffering socket client
///
/// A manager owns at most one live transport. It reconnects after
/// unexpected closures (when enabled) with a 1.5x backoff, and can buffer
/// inbound messages and deliver them in periodic batches.
///
/// All state transitions, buffering and listener calls happen on one driver
/// task, so listeners never run concurrently with each other. Every public
/// method returns immediately; outcomes are reported through listeners.
///
/// The handle is cheap to clone. Listeners that capture a clone keep the
/// manager alive until [`ConnectionManager::destroy`] is called.
///
/// # Example
/// ```ignore
/// let manager = ConnectionManager::builder()
///     .url("wss://stream.example.com/ws")
///     .reconnect(true)
///     .decode_json(true)
///     .buffer(128, Duration::from_millis(250))
///     .on_open(|| tracing::info!("connected"))
///     .on_bulk_message(|batch| tracing::info!("{} messages", batch.len()))
///     .connect()?;
///
/// manager.send(r#"{"op":"subscribe"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
    config: Arc<SocketConfig>,
    command_tx: UnboundedSender<ClientCommand>,
    task_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl ConnectionManager {
    /// Start configuring a manager
    pub fn builder() -> ConnectionBuilder<NoUrl> {
        ConnectionBuilder::new()
    }

    /// Create a manager that connects over WebSocket
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SocketConfig) -> Result<Self> {
        Self::with_connector(config, WsConnector::new())
    }

    /// Create a manager that opens transports through `connector`
    pub fn with_connector(config: SocketConfig, connector: impl Connector) -> Result<Self> {
        Self::start(config, Arc::new(connector), ListenerRegistry::new())
    }

    pub(crate) fn start(
        config: SocketConfig,
        connector: Arc<dyn Connector>,
        listeners: ListenerRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SocketError::Runtime(format!("No Tokio runtime: {}", e)))?;

        let config = Arc::new(config);
        let shared = Arc::new(Shared {
            id: config.id.clone(),
            state: AtomicConnectionState::new(ConnectionState::Initializing),
            metrics: AtomicMetrics::new(),
            paused: AtomicBool::new(false),
            listeners: RwLock::new(listeners),
        });

        let (command_tx, command_rx) = unbounded_channel();

        let driver = Driver::new(Arc::clone(&shared), Arc::clone(&config), connector);
        let task_handle = runtime.spawn(driver.run(command_rx));

        info!("[{}] Connection manager created for {}", shared.id, config.target().url);

        Ok(Self {
            shared,
            config,
            command_tx,
            task_handle: Arc::new(Mutex::new(Some(task_handle))),
        })
    }

    /// Identity token used in log lines
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// The configuration this manager was created with
    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Send a payload over the live transport
    ///
    /// Silently dropped when no transport is live or the manager is destroyed.
    pub fn send(&self, payload: impl Into<Payload>) {
        if self.shared.state.is_destroyed() {
            return;
        }
        let _ = self.command_tx.send(ClientCommand::Send(payload.into()));
    }

    /// Register a listener for successful opens
    pub fn on_open<F>(&self, listener: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Listener::Opened(Arc::new(listener)))
    }

    /// Register a listener for transport closures
    pub fn on_close<F>(&self, listener: F) -> &Self
    where
        F: Fn(&CloseInfo) + Send + Sync + 'static,
    {
        self.register(Listener::Closed(Arc::new(listener)))
    }

    /// Register a listener for transport errors
    pub fn on_error<F>(&self, listener: F) -> &Self
    where
        F: Fn(&SocketError) + Send + Sync + 'static,
    {
        self.register(Listener::Errored(Arc::new(listener)))
    }

    /// Register a per-message listener
    pub fn on_message<F>(&self, listener: F) -> &Self
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.register(Listener::Message(Arc::new(listener)))
    }

    /// Register a listener that receives each buffered batch at once
    ///
    /// While at least one is registered, flushes go to bulk listeners only.
    pub fn on_bulk_message<F>(&self, listener: F) -> &Self
    where
        F: Fn(&[Payload]) + Send + Sync + 'static,
    {
        self.register(Listener::BulkMessage(Arc::new(listener)))
    }

    /// Register a listener for teardown
    pub fn on_destroy<F>(&self, listener: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Listener::Destroyed(Arc::new(listener)))
    }

    fn register(&self, listener: Listener) -> &Self {
        let mut registry = self.shared.listeners.write();
        if !self.shared.state.is_destroyed() {
            registry.register(listener);
        }
        self
    }

    /// Suspend buffer flushes. Messages keep accumulating.
    pub fn pause(&self) {
        if self.shared.state.is_destroyed() {
            return;
        }
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Re-enable flushes and flush immediately
    pub fn resume(&self) {
        if self.shared.state.is_destroyed() {
            return;
        }
        self.shared.paused.store(false, Ordering::Release);
        let _ = self.command_tx.send(ClientCommand::Flush);
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Get current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Number of messages waiting for the next flush
    #[inline]
    pub fn buffered_count(&self) -> usize {
        self.shared.metrics.buffered()
    }

    /// Check whether a reconnect attempt is scheduled
    #[inline]
    pub fn is_reconnect_pending(&self) -> bool {
        self.shared.metrics.reconnect_pending()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        let metrics = &self.shared.metrics;
        Metrics {
            messages_sent: metrics.messages_sent(),
            messages_received: metrics.messages_received(),
            messages_evicted: metrics.messages_evicted(),
            reconnect_attempts: metrics.reconnect_attempts(),
            buffered: metrics.buffered(),
            connection_state: self.shared.state.get(),
        }
    }

    /// Tear the manager down
    ///
    /// The state becomes `Destroyed` immediately and every public operation
    /// turns into a no-op. The driver then closes the transport, cancels its
    /// timers and notifies destroy listeners. Calling this again does nothing.
    pub fn destroy(&self) {
        if self.shared.state.destroy() {
            info!("[{}] Destroy requested", self.shared.id);
            let _ = self.command_tx.send(ClientCommand::Destroy);
        }
    }

    /// Destroy and wait for the driver task to finish teardown
    pub async fn shutdown(self) -> Result<()> {
        self.destroy();
        let handle = self.task_handle.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| SocketError::Other(format!("Driver task failed: {}", e)))?;
        }
        Ok(())
    }
}

/// A scheduled reconnect attempt
struct PendingReconnect {
    sleep: Pin<Box<Sleep>>,
    delay: Duration,
}

/// Owns the transport, timers and buffer of one manager
struct Driver {
    shared: Arc<Shared>,
    config: Arc<SocketConfig>,
    connector: Arc<dyn Connector>,
    transport: Option<TransportHandle>,
    reconnect: Option<PendingReconnect>,
    backoff: ReconnectBackoff,
    buffer: MessageBuffer,
    flush_timer: Option<Interval>,
}

impl Driver {
    fn new(shared: Arc<Shared>, config: Arc<SocketConfig>, connector: Arc<dyn Connector>) -> Self {
        let flush_timer = config.is_buffered().then(|| {
            let period = config.flush_interval();
            let mut timer = tokio::time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer
        });

        Self {
            backoff: config.backoff(),
            buffer: MessageBuffer::new(config.buffer_capacity),
            shared,
            config,
            connector,
            transport: None,
            reconnect: None,
            flush_timer,
        }
    }

    /// Main driver loop
    async fn run(mut self, mut command_rx: UnboundedReceiver<ClientCommand>) {
        self.connect();

        loop {
            if self.shared.state.is_destroyed() {
                break;
            }

            tokio::select! {
                biased;

                cmd = command_rx.recv() => match cmd {
                    Some(ClientCommand::Send(payload)) => self.send(payload),
                    Some(ClientCommand::Flush) => self.flush(),
                    Some(ClientCommand::Destroy) => {}
                    None => {
                        debug!("[{}] All handles dropped, destroying", self.shared.id);
                        self.shared.state.destroy();
                    }
                },

                event = next_transport_event(&mut self.transport) => self.handle_event(event),

                delay = reconnect_due(&mut self.reconnect) => self.on_reconnect_due(delay),

                _ = flush_due(&mut self.flush_timer) => self.flush(),
            }
        }

        self.teardown();
        debug!("[{}] Driver task exiting", self.shared.id);
    }

    /// Replace the transport with a freshly opened one
    fn connect(&mut self) {
        if self.shared.state.is_destroyed() {
            return;
        }

        if let Some(previous) = self.transport.take() {
            let _ = previous.close();
        }
        self.shared.state.set(ConnectionState::Initializing);
        self.clear_buffer();

        let target = self.config.target();
        debug!("[{}] Connecting to {}", self.shared.id, target.url);

        match self.connector.open(&target) {
            Ok(handle) => self.transport = Some(handle),
            Err(e) => {
                warn!("[{}] Failed to create transport for {}: {}", self.shared.id, target.url, e);
                self.schedule_reconnect();
            }
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        if self.shared.state.is_destroyed() {
            return;
        }

        match event {
            Some(TransportEvent::Opened) => self.on_open(),
            Some(TransportEvent::Message(payload)) => self.on_message(payload),
            Some(TransportEvent::Error(err)) => self.on_error(err),
            Some(TransportEvent::Closed(info)) => self.on_close(info),
            None => self.on_close(CloseInfo::abnormal("transport ended without closing")),
        }
    }

    fn on_open(&mut self) {
        if !self.shared.state.set(ConnectionState::Opened) {
            return;
        }
        self.cancel_reconnect();
        self.backoff.reset();
        info!("[{}] Connected to {}", self.shared.id, self.config.target().url);
        self.emit(Event::Opened);
    }

    fn on_error(&mut self, err: SocketError) {
        let _ = self
            .shared
            .state
            .compare_exchange(ConnectionState::Opened, ConnectionState::Errored);
        error!("[{}] Transport error: {}", self.shared.id, err);
        self.emit(Event::Errored(&err));
        self.schedule_reconnect();
    }

    fn on_close(&mut self, info: CloseInfo) {
        if !self.shared.state.set(ConnectionState::Closed) {
            return;
        }
        self.transport = None;
        self.clear_buffer();

        if info.is_normal() {
            info!("[{}] Connection closed ({} {})", self.shared.id, info.code, info.reason);
        } else {
            warn!("[{}] Connection lost ({} {})", self.shared.id, info.code, info.reason);
        }

        self.emit(Event::Closed(&info));
        self.schedule_reconnect();
    }

    fn on_message(&mut self, raw: Payload) {
        self.shared.metrics.increment_received();

        let payload = if self.config.decode_json {
            match raw.try_decode() {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("[{}] Delivering undecoded payload: {}", self.shared.id, e);
                    raw
                }
            }
        } else {
            raw
        };

        if self
            .shared
            .state
            .compare_exchange(ConnectionState::Errored, ConnectionState::Opened)
            .is_ok()
        {
            debug!("[{}] Traffic after error, connection considered open", self.shared.id);
            self.cancel_reconnect();
        }

        if self.config.is_buffered() {
            if self.buffer.push(payload).is_some() {
                self.shared.metrics.increment_evicted();
                debug!("[{}] Buffer full, evicted oldest message", self.shared.id);
            }
            self.shared.metrics.set_buffered(self.buffer.len());
        } else {
            self.emit(Event::Message(&payload));
        }
    }

    fn send(&mut self, payload: Payload) {
        match &self.transport {
            Some(transport) if transport.send(payload.into_wire()) => {
                self.shared.metrics.increment_sent();
            }
            _ => debug!("[{}] No live transport, dropping outbound payload", self.shared.id),
        }
    }

    /// Deliver everything buffered, unless paused
    fn flush(&mut self) {
        if self.shared.paused.load(Ordering::Acquire) || self.buffer.is_empty() {
            return;
        }

        let batch = self.buffer.drain();
        self.shared.metrics.set_buffered(0);
        debug!("[{}] Flushing {} buffered messages", self.shared.id, batch.len());

        let has_bulk = self.shared.listeners.read().has(EventKind::BulkMessage);
        if has_bulk {
            self.emit(Event::BulkMessage(&batch));
        } else {
            for payload in &batch {
                self.emit(Event::Message(payload));
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.config.reconnect || self.shared.state.is_destroyed() || self.reconnect.is_some() {
            return;
        }

        let delay = self.backoff.next_delay();
        info!("[{}] Reconnecting in {:?}", self.shared.id, delay);
        self.reconnect = Some(PendingReconnect {
            sleep: Box::pin(tokio::time::sleep(delay)),
            delay,
        });
        self.shared.metrics.set_reconnect_pending(true);
    }

    fn cancel_reconnect(&mut self) {
        if self.reconnect.take().is_some() {
            debug!("[{}] Pending reconnect cancelled", self.shared.id);
        }
        self.shared.metrics.set_reconnect_pending(false);
    }

    fn on_reconnect_due(&mut self, delay: Duration) {
        self.cancel_reconnect();
        self.backoff.charge(delay);

        if self.backoff.is_exhausted() {
            warn!(
                "[{}] Reconnect budget of {:?} exhausted after {:?}, giving up",
                self.shared.id,
                self.backoff.budget().unwrap_or_default(),
                self.backoff.elapsed()
            );
            self.shared.state.destroy();
            return;
        }

        self.shared.metrics.increment_reconnects();
        self.connect();
    }

    fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.shared.metrics.set_buffered(0);
    }

    fn emit(&self, event: Event<'_>) {
        if self.shared.state.is_destroyed() {
            return;
        }
        let listeners = self.shared.listeners.read().snapshot(event.kind());
        // A listener may destroy the manager; later ones must not run
        dispatch(&self.shared.id, &listeners, event, || {
            self.shared.state.is_destroyed()
        });
    }

    /// Release everything. Runs once, after the state became Destroyed.
    fn teardown(&mut self) {
        info!("[{}] Tearing down", self.shared.id);

        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                debug!("[{}] Error closing transport: {}", self.shared.id, e);
            }
        }
        self.flush_timer = None;
        self.cancel_reconnect();

        let listeners = self.shared.listeners.read().snapshot(EventKind::Destroyed);
        dispatch(&self.shared.id, &listeners, Event::Destroyed, || false);

        self.clear_buffer();
        self.shared.listeners.write().clear();
    }
}

async fn next_transport_event(transport: &mut Option<TransportHandle>) -> Option<TransportEvent> {
    match transport {
        Some(transport) => transport.next_event().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(pending: &mut Option<PendingReconnect>) -> Duration {
    match pending {
        Some(pending) => {
            pending.sleep.as_mut().await;
            pending.delay
        }
        None => std::future::pending().await,
    }
}

async fn flush_due(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
