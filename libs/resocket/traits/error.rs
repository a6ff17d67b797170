use thiserror::Error;

/// Main error type for resocket
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocketError {
    /// WebSocket protocol or I/O error reported by the transport
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The target address or negotiation headers could not be turned into a request
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Payload decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No async runtime available to drive the connection
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for resocket operations
pub type Result<T> = std::result::Result<T, SocketError>;
