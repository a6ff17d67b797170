//! CLI utilities for binaries
//!
//! Handles configuration loading and environment variables
//! for all binary executables.

use anyhow::Context;
use resocket::SocketConfig;
use std::path::{Path, PathBuf};

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Socket configuration (config/socket.yaml)
    Socket,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Socket => "config/socket.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "SOCKET_CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
///
/// A `Custom` path always wins over the environment.
///
/// # Examples
/// ```
/// use resocket_tools::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("feeds/btc.yaml".into()));
/// assert_eq!(path.to_str(), Some("feeds/btc.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return path.into();
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Resolve the socket configuration for a binary
///
/// The first argument may be a socket URL (`ws://...`, `wss://...`), which
/// yields a default configuration for that URL, or a path to a YAML file.
/// Without arguments the path comes from `SOCKET_CONFIG_PATH`.
pub fn load_socket_config(args: &[String]) -> anyhow::Result<SocketConfig> {
    match args.first() {
        Some(arg) if arg.contains("://") => Ok(SocketConfig::new(arg.clone())),
        Some(path) => read_config(Path::new(path)),
        None => read_config(&load_config_from_env(ConfigType::Socket)),
    }
}

/// One-line description of where a config connects and how
///
/// Reports the address actually dialed, so a `host` override shows up.
pub fn describe_config(config: &SocketConfig) -> String {
    format!(
        "{} (reconnect: {}, buffered: {})",
        config.target().url,
        config.reconnect,
        config.is_buffered()
    )
}

fn read_config(path: &Path) -> anyhow::Result<SocketConfig> {
    SocketConfig::from_file(path)
        .with_context(|| format!("Failed to load socket config from {}", path.display()))
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
