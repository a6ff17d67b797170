use crate::error::{Result, SocketError};
use serde_json::Value;

/// A single frame of application data, inbound or outbound
///
/// Transports only ever produce `Text` and `Binary`. `Json` appears on the
/// inbound side once decoding is enabled, and may be sent, in which case it
/// is serialized to a text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
    Json(Value),
}

impl Payload {
    /// Get the payload as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the payload as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Payload::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get the decoded JSON value, if the payload was decoded
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    /// Parse the raw frame as JSON
    ///
    /// The raw payload is left untouched so callers can fall back to it.
    pub fn try_decode(&self) -> Result<Payload> {
        let value = match self {
            Payload::Text(text) => serde_json::from_str::<Value>(text),
            Payload::Binary(bytes) => serde_json::from_slice::<Value>(bytes),
            Payload::Json(value) => return Ok(Payload::Json(value.clone())),
        };
        value
            .map(Payload::Json)
            .map_err(|e| SocketError::Decode(e.to_string()))
    }

    /// Serialize for the wire. JSON values become text frames.
    pub fn into_wire(self) -> Payload {
        match self {
            Payload::Json(value) => Payload::Text(value.to_string()),
            other => other,
        }
    }

    /// Size of the raw frame in bytes (JSON is measured serialized)
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(s) => s.len(),
            Payload::Binary(b) => b.len(),
            Payload::Json(v) => v.to_string().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}
