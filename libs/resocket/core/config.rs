use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default flush interval for buffered delivery, in milliseconds
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 500;

/// Whole milliseconds, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for a ConnectionManager
///
/// Every field except `url` has a default, so a YAML document only needs
/// the keys it wants to change:
///
/// ```yaml
/// id: prices
/// url: wss://stream.example.com/ws
/// reconnect: true
/// decode_json: true
/// buffer_capacity: 256
/// flush_interval_ms: 250
/// reconnect_budget_ms: 600000
/// base_reconnect_delay_ms: 1000
/// ```
///
/// The manager takes its own copy at construction; later changes to a
/// config value have no effect on a running manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Identity token used to tag log lines
    pub id: String,

    /// Default target address (ws:// or wss://)
    pub url: String,

    /// Explicit host override. When set it replaces `url` and enables
    /// protocol negotiation.
    pub host: Option<String>,

    /// Sub-protocol tokens, only sent together with `host`
    pub protocols: Vec<String>,

    /// Reconnect after unexpected closure or error
    pub reconnect: bool,

    /// Parse inbound frames as JSON before delivery
    pub decode_json: bool,

    /// Buffered delivery capacity (0 = deliver immediately)
    pub buffer_capacity: usize,

    /// Interval between buffer flushes
    pub flush_interval_ms: u64,

    /// Total reconnect delay allowed over the manager's lifetime (None = unlimited)
    pub reconnect_budget_ms: Option<u64>,

    /// Delay before the first reconnect attempt
    pub initial_reconnect_delay_ms: u64,

    /// Value the 1.5x growth starts from for the second and later attempts
    pub base_reconnect_delay_ms: u64,

    /// Cap for a single reconnect delay
    pub max_reconnect_delay_ms: u64,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            id: "socket".to_string(),
            url: String::new(),
            host: None,
            protocols: Vec::new(),
            reconnect: false,
            decode_json: false,
            buffer_capacity: 0,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            reconnect_budget_ms: None,
            initial_reconnect_delay_ms: millis(DEFAULT_INITIAL_DELAY),
            base_reconnect_delay_ms: millis(DEFAULT_BASE_DELAY),
            max_reconnect_delay_ms: millis(DEFAULT_MAX_DELAY),
        }
    }
}

impl SocketConfig {
    /// Create a configuration for the given URL with all defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SocketConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SocketError::Configuration(format!("Invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            SocketError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Check the configuration for values the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.target().url.trim().is_empty() {
            return Err(SocketError::Configuration("url must not be empty".into()));
        }
        if self.buffer_capacity > 0 && self.flush_interval_ms == 0 {
            return Err(SocketError::Configuration(
                "flush_interval_ms must be positive when buffering".into(),
            ));
        }
        if self.max_reconnect_delay_ms < self.initial_reconnect_delay_ms {
            return Err(SocketError::Configuration(format!(
                "max_reconnect_delay_ms ({}) is below initial_reconnect_delay_ms ({})",
                self.max_reconnect_delay_ms, self.initial_reconnect_delay_ms
            )));
        }
        Ok(())
    }

    /// Resolve the address and protocol tokens for a connection attempt
    pub fn target(&self) -> ConnectTarget {
        match &self.host {
            Some(host) => ConnectTarget::new(host.clone()).with_protocols(self.protocols.clone()),
            None => ConnectTarget::new(self.url.clone()),
        }
    }

    /// Check if buffered delivery is enabled
    pub fn is_buffered(&self) -> bool {
        self.buffer_capacity > 0
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn reconnect_budget(&self) -> Option<Duration> {
        self.reconnect_budget_ms.map(Duration::from_millis)
    }

    /// Build the backoff policy described by this configuration
    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(
            Duration::from_millis(self.initial_reconnect_delay_ms),
            Duration::from_millis(self.base_reconnect_delay_ms),
            Duration::from_millis(self.max_reconnect_delay_ms),
            self.reconnect_budget(),
        )
    }
}
