use events::{StreamEvent, CONNECTION};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a client instance, used to tell connections apart in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    /// Terminal: reconnect attempts are exhausted.
    Error,
    /// Terminal: the client was closed on purpose.
    Closed,
}

impl ConnectionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Error | ConnectionStatus::Closed)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error => write!(f, "error"),
            ConnectionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Connection state published by the client.
/// `retry_count` is the number of consecutive failed attempts so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub retry_count: u32,
    pub last_event_id: Option<String>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            retry_count: 0,
            last_event_id: None,
        }
    }

    /// The synthetic `connection` event announcing this state.
    pub fn to_event(&self) -> StreamEvent {
        let payload = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        StreamEvent::new(CONNECTION, payload)
    }

    /// Decode a `connection` event back into a state. Returns `None` for any
    /// other event or for a payload that does not describe a state.
    pub fn from_event(event: &StreamEvent) -> Option<Self> {
        if event.name != CONNECTION {
            return None;
        }
        serde_json::from_value(event.payload.clone()).ok()
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
