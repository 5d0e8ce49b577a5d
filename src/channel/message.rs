//! Wire messages of the realtime channel.
//!
//! The channel itself only produces the auth handshake and delivers inbound
//! frames as raw JSON. [`RealtimeEvent`] is an optional typed view over the
//! inbound `type` discriminator for consumers that want one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First outbound frame after connecting, sent when a token is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMessage {
    /// Session token
    pub token: String,
}

impl AuthMessage {
    /// Handshake carrying `token`.
    pub fn new(token: impl Into<String>) -> Self {
        AuthMessage { token: token.into() }
    }

    /// Wire form, `{"type":"auth","token":...}`.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "type": "auth", "token": self.token }).to_string()
    }
}

/// Push notification kinds published by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// An agent changed status
    AgentStatus {
        /// Agent identifier
        #[serde(rename = "agentId")]
        agent_id: String,
        /// New status, e.g. `active`, `idle`, `offline`
        status: String,
    },
    /// A new activity row
    NewActivity {
        /// Activity payload as sent by the server
        activity: Value,
    },
    /// A dashboard metric changed
    MetricUpdate {
        /// Metric name
        metric: String,
        /// New value
        value: Value,
    },
    /// A log line
    LogEntry {
        /// Severity, e.g. `info`, `warning`, `error`
        level: String,
        /// Log text
        message: String,
    },
    /// Any other `type`
    #[serde(other)]
    Unknown,
}

impl RealtimeEvent {
    /// Decode an inbound message; `None` when a known `type` has malformed fields.
    pub fn from_value(value: &Value) -> Option<Self> {
        RealtimeEvent::deserialize(value).ok()
    }
}
