pub mod states;

use crate::client::ConnectionManager;
use crate::config::{millis, SocketConfig};
use crate::listeners::{Listener, ListenerRegistry};
use crate::traits::*;
use crate::transport::WsConnector;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for ConnectionManager
///
/// The target URL must be set before `connect()` becomes available.
/// Listeners registered here are in place before the first connection
/// attempt, so none of them can miss the initial `opened` event.
pub struct ConnectionBuilder<U>
where
    U: UrlState,
{
    _state: PhantomData<U>,
    config: SocketConfig,
    connector: Option<Arc<dyn Connector>>,
    listeners: ListenerRegistry,
}

impl ConnectionBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            config: SocketConfig::default(),
            connector: None,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Set the default target address
    pub fn url(mut self, url: impl Into<String>) -> ConnectionBuilder<HasUrl> {
        self.config.url = url.into();
        self.into_state()
    }

    /// Start from a complete configuration (e.g. loaded from YAML)
    pub fn config(mut self, config: SocketConfig) -> ConnectionBuilder<HasUrl> {
        self.config = config;
        self.into_state()
    }
}

impl Default for ConnectionBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> ConnectionBuilder<U>
where
    U: UrlState,
{
    fn into_state<V: UrlState>(self) -> ConnectionBuilder<V> {
        ConnectionBuilder {
            _state: PhantomData,
            config: self.config,
            connector: self.connector,
            listeners: self.listeners,
        }
    }

    /// Identity token for log lines
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    /// Explicit host override; enables protocol negotiation
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Sub-protocol tokens (only sent with a host override)
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.config.reconnect = enabled;
        self
    }

    pub fn decode_json(mut self, enabled: bool) -> Self {
        self.config.decode_json = enabled;
        self
    }

    /// Enable buffered delivery with the given capacity and flush interval
    pub fn buffer(mut self, capacity: usize, flush_interval: Duration) -> Self {
        self.config.buffer_capacity = capacity;
        self.config.flush_interval_ms = millis(flush_interval);
        self
    }

    /// Give up (and destroy) once this much reconnect delay has elapsed
    pub fn reconnect_budget(mut self, budget: Duration) -> Self {
        self.config.reconnect_budget_ms = Some(millis(budget));
        self
    }

    /// Override the backoff: first delay, growth base and cap
    pub fn backoff(mut self, initial: Duration, base: Duration, max: Duration) -> Self {
        self.config.initial_reconnect_delay_ms = millis(initial);
        self.config.base_reconnect_delay_ms = millis(base);
        self.config.max_reconnect_delay_ms = millis(max);
        self
    }

    /// Use a custom transport instead of WebSocket
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn on_open<F>(mut self, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Opened(Arc::new(listener)));
        self
    }

    pub fn on_close<F>(mut self, listener: F) -> Self
    where
        F: Fn(&CloseInfo) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Closed(Arc::new(listener)));
        self
    }

    pub fn on_error<F>(mut self, listener: F) -> Self
    where
        F: Fn(&SocketError) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Errored(Arc::new(listener)));
        self
    }

    pub fn on_message<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Message(Arc::new(listener)));
        self
    }

    pub fn on_bulk_message<F>(mut self, listener: F) -> Self
    where
        F: Fn(&[Payload]) + Send + Sync + 'static,
    {
        self.listeners.register(Listener::BulkMessage(Arc::new(listener)));
        self
    }

    pub fn on_destroy<F>(mut self, listener: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.register(Listener::Destroyed(Arc::new(listener)));
        self
    }

    /// Current configuration (for inspection before connecting)
    pub fn current_config(&self) -> &SocketConfig {
        &self.config
    }
}

impl ConnectionBuilder<HasUrl> {
    /// Validate the configuration and start the manager
    ///
    /// Fails only for invalid configuration or a missing Tokio runtime.
    /// Connection problems are reported to listeners, never here.
    pub fn connect(self) -> Result<ConnectionManager> {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new()));
        ConnectionManager::start(self.config, connector, self.listeners)
    }
}
