//! Lifecycle states of the realtime channel.

use std::fmt;

/// Connection state of an [`EventChannel`](super::EventChannel).
///
/// ```text
/// Disconnected ──open──▶ Connecting ──connected──▶ Authenticating ──sent──▶ Open
///      ▲                     │   └──────── no token ──────────────────────▶ │
///      │                     ▼                                               │
///      └──── close / error (reconnect after delay) ◀─────────────────────────┘
///      └──── disconnect() ◀── Closing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// No transport; a reconnect may be pending
    #[default]
    Disconnected,
    /// Transport connection in progress
    Connecting,
    /// Connected, sending the auth handshake
    Authenticating,
    /// Usable: inbound messages are delivered and `send` transmits
    Open,
    /// Explicit shutdown in progress
    Closing,
}

impl ChannelState {
    /// Whether outbound messages can be transmitted.
    pub fn is_open(self) -> bool {
        self == ChannelState::Open
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Authenticating => "authenticating",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
        };
        f.write_str(name)
    }
}
