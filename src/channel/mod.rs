//! Realtime event channel.
//!
//! A persistent WebSocket connection for server-push updates. Once opened,
//! the channel authenticates after every (re)connect, delivers parsed inbound
//! messages to its consumer and re-establishes itself after unexpected
//! closes until explicitly disconnected.
//!
//! # Module Organization
//!
//! ```text
//! channel/
//! ├── events    - ChannelEvents consumer stream
//! ├── message   - auth handshake and typed realtime events
//! ├── state     - ChannelState lifecycle
//! ├── transport - Connector/Connection seam, tokio-tungstenite implementation
//! └── worker    - background task owning the transport
//! ```
//!
//! # Lifecycle
//!
//! | Trigger | Transition |
//! |---------|------------|
//! | `open()` | `Disconnected → Connecting` |
//! | transport connected, token set | `Connecting → Authenticating → Open` |
//! | transport connected, no token | `Connecting → Open` |
//! | peer close / transport error | `→ Disconnected`, reconnect after the policy delay |
//! | `disconnect()` | `→ Closing → Disconnected`, no reconnect |

mod events;
mod message;
mod state;
mod transport;
mod worker;

#[cfg(test)]
pub(crate) mod fake;

pub use events::{ChannelEvent, ChannelEvents};
pub use message::{AuthMessage, RealtimeEvent};
pub use state::ChannelState;
pub use transport::{Connection, Connector, WsConnection, WsConnector};

use crate::client::TokenStore;
use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use worker::Worker;

const OUTBOUND_BUFFER: usize = 64;

struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    outbound: mpsc::Sender<String>,
    state: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

/// Persistent, self-healing realtime connection.
///
/// At most one transport is live per channel: `open()` fully tears down the
/// previous connection, including any pending reconnect, before starting a
/// new one.
pub struct EventChannel {
    url: String,
    connector: Arc<dyn Connector>,
    token: TokenStore,
    policy: ReconnectPolicy,
    event_buffer: usize,
    worker: Mutex<Option<WorkerHandle>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl EventChannel {
    /// Channel for `config`'s streaming address, authenticating with `token`.
    pub fn new(config: &ClientConfig, token: TokenStore, connector: Arc<dyn Connector>) -> Result<Self> {
        Ok(EventChannel {
            url: config.channel_url()?,
            connector,
            token,
            policy: config.reconnect,
            event_buffer: config.event_buffer.max(1),
            worker: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }

    /// Streaming address the channel connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state; `Disconnected` when never opened or closed.
    pub fn state(&self) -> ChannelState {
        self.worker
            .lock()
            .as_ref()
            .map(|handle| *handle.state.borrow())
            .unwrap_or_default()
    }

    /// Watch state changes of the current connection, if one was opened.
    pub fn watch_state(&self) -> Option<watch::Receiver<ChannelState>> {
        self.worker.lock().as_ref().map(|handle| handle.state.clone())
    }

    /// Start connecting, replacing any existing connection.
    ///
    /// The previous connection is closed and its worker has exited before the
    /// new one is spawned. The returned stream carries every event of this
    /// connection and of its reconnects.
    pub async fn open(&self) -> ChannelEvents {
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await;

        let (event_tx, event_rx) = mpsc::channel(self.event_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        let worker = Worker {
            url: self.url.clone(),
            connector: Arc::clone(&self.connector),
            token: self.token.clone(),
            policy: self.policy,
            state: state_tx,
            events: event_tx,
            outbound: outbound_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        *self.worker.lock() = Some(WorkerHandle {
            shutdown: shutdown_tx,
            outbound: outbound_tx,
            state: state_rx,
            task,
        });
        debug!(url = %self.url, "channel opened");

        ChannelEvents::new(event_rx)
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Returns once the transport is closed and the worker has exited.
    pub async fn disconnect(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.teardown().await;
    }

    /// Request shutdown without waiting for it.
    ///
    /// The worker stops at its next suspension point; a later `open()` or
    /// `disconnect()` still waits for it to finish.
    pub fn close_now(&self) {
        if let Some(handle) = self.worker.lock().as_ref() {
            handle.shutdown.send_replace(true);
        }
    }

    /// Transmit `message` as JSON.
    ///
    /// Only sent when the channel is `Open`; otherwise the message is dropped
    /// and a warning is logged.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("dropping unserializable channel message: {}", e);
                return;
            }
        };

        let guard = self.worker.lock();
        match guard.as_ref() {
            Some(handle) if handle.state.borrow().is_open() => {
                if let Err(e) = handle.outbound.try_send(text) {
                    warn!("channel outbound queue unavailable, dropping message: {}", e);
                }
            }
            _ => warn!("channel not open, dropping outbound message"),
        }
    }

    async fn teardown(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            handle.shutdown.send_replace(true);
            if let Err(e) = handle.task.await {
                warn!("channel worker ended abnormally: {}", e);
            }
            debug!(url = %self.url, "channel closed");
        }
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.close_now();
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeConnector, Frame};
    use super::*;
    use crate::config::ReconnectPolicy;
    use crate::Backoff;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn channel_with(connector: Arc<FakeConnector>, token: &TokenStore) -> EventChannel {
        let config = ClientConfig::new("https://api.test/v1");
        EventChannel::new(&config, token.clone(), connector).unwrap()
    }

    /// Drain events until `target` is reached, returning everything before it.
    async fn until_state(events: &mut ChannelEvents, target: ChannelState) -> Vec<ChannelEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.next().await {
            if matches!(event, ChannelEvent::State(s) if s == target) {
                return seen;
            }
            seen.push(event);
        }
        panic!("event stream ended before reaching {}", target);
    }

    #[test]
    fn test_channel_url() {
        let channel = channel_with(FakeConnector::new(), &TokenStore::new());
        assert_eq!(channel.url(), "wss://api.test/v1/ws/realtime");
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_sent_when_token_set() {
        let connector = FakeConnector::new();
        let token = TokenStore::new();
        token.set("jwt-1");
        let channel = channel_with(connector.clone(), &token);

        let mut events = channel.open().await;
        let before = until_state(&mut events, ChannelState::Open).await;
        assert!(matches!(
            before[..],
            [
                ChannelEvent::State(ChannelState::Connecting),
                ChannelEvent::State(ChannelState::Authenticating)
            ]
        ));

        let peer = connector.peer(0);
        assert_eq!(peer.sent(), vec![r#"{"token":"jwt-1","type":"auth"}"#.to_string()]);
        assert_eq!(connector.urls(), vec!["wss://api.test/v1/ws/realtime".to_string()]);
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_changes_survive_a_slow_consumer() {
        let connector = FakeConnector::new();
        let token = TokenStore::new();
        token.set("jwt-1");
        let mut config = ClientConfig::new("https://api.test/v1");
        config.event_buffer = 1;
        let channel = EventChannel::new(&config, token, connector.clone()).unwrap();

        let mut events = channel.open().await;
        sleep(Duration::from_millis(10)).await;

        let mut states = Vec::new();
        while states.len() < 7 {
            match events.next().await {
                Some(ChannelEvent::State(state)) => states.push(state),
                other => panic!("unexpected event {:?}", other),
            }
            if states.len() == 3 {
                connector.peer(0).push(Frame::Close);
            }
        }
        assert_eq!(
            states,
            vec![
                ChannelState::Connecting,
                ChannelState::Authenticating,
                ChannelState::Open,
                ChannelState::Disconnected,
                ChannelState::Connecting,
                ChannelState::Authenticating,
                ChannelState::Open,
            ]
        );
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_handshake_without_token() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());

        let mut events = channel.open().await;
        let before = until_state(&mut events, ChannelState::Open).await;
        assert!(matches!(before[..], [ChannelEvent::State(ChannelState::Connecting)]));
        assert!(connector.peer(0).sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_message_is_dropped() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        let peer = connector.peer(0);
        peer.push(Frame::Text("{not json".into()));
        peer.push(Frame::Text(r#"{"type":"metric_update","metric":"latency","value":98}"#.into()));

        let next = events.next().await;
        assert!(matches!(
            next,
            Some(ChannelEvent::Message(ref v)) if v["metric"] == "latency"
        ));
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay_forever() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        connector.refuse(true);
        let closed_at = Instant::now();
        connector.peer(0).push(Frame::Close);

        sleep(Duration::from_millis(20_001)).await;
        let connects = connector.connect_times();
        assert_eq!(connects.len(), 5);
        for (i, at) in connects[1..].iter().enumerate() {
            assert_eq!(*at - closed_at, Duration::from_millis(5000 * (i as u64 + 1)));
        }
        assert_eq!(channel.state(), ChannelState::Disconnected);

        connector.refuse(false);
        sleep(Duration::from_millis(5000)).await;
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_not_an_error() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        connector.peer(0).push(Frame::Close);
        let before = until_state(&mut events, ChannelState::Disconnected).await;
        assert!(before.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_reported_before_disconnect() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        connector.peer(0).push(Frame::Error("connection reset".into()));
        let before = until_state(&mut events, ChannelState::Disconnected).await;
        assert!(matches!(
            before[..],
            [ChannelEvent::Error(ref e)] if e.to_string().contains("connection reset")
        ));

        until_state(&mut events, ChannelState::Open).await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_suppresses_reconnect() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        channel.disconnect().await;
        assert!(connector.peer(0).is_closed());
        assert_eq!(channel.state(), ChannelState::Disconnected);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.attempts(), 1);

        let rest: Vec<_> = std::iter::from_fn(|| events.try_next()).collect();
        assert!(matches!(
            rest[..],
            [
                ChannelEvent::State(ChannelState::Closing),
                ChannelEvent::State(ChannelState::Disconnected)
            ]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let connector = FakeConnector::new();
        connector.refuse(true);
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Disconnected).await;

        sleep(Duration::from_millis(2500)).await;
        channel.disconnect().await;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_only_when_open() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());

        channel.send(&json!({ "type": "ping" }));
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;

        channel.send(&json!({ "type": "subscribe", "topic": "agents" }));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(
            connector.peer(0).sent(),
            vec![r#"{"topic":"agents","type":"subscribe"}"#.to_string()]
        );

        channel.disconnect().await;
        channel.send(&json!({ "type": "late" }));
        assert_eq!(connector.peer(0).sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_tears_down_previous_connection() {
        let connector = FakeConnector::new();
        let channel = channel_with(connector.clone(), &TokenStore::new());
        let mut first = channel.open().await;
        until_state(&mut first, ChannelState::Open).await;

        let mut second = channel.open().await;
        assert!(connector.peer(0).is_closed());
        until_state(&mut second, ChannelState::Open).await;
        assert_eq!(connector.attempts(), 2);
        assert!(!connector.peer(1).is_closed());

        // the first stream ends once its worker is gone
        until_state(&mut first, ChannelState::Disconnected).await;
        assert!(first.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_reads_token_at_send_time() {
        let connector = FakeConnector::new();
        let token = TokenStore::new();
        let channel = channel_with(connector.clone(), &token);
        let mut events = channel.open().await;
        until_state(&mut events, ChannelState::Open).await;
        assert!(connector.peer(0).sent().is_empty());

        token.set("fresh");
        connector.peer(0).push(Frame::Close);
        until_state(&mut events, ChannelState::Authenticating).await;
        until_state(&mut events, ChannelState::Open).await;
        assert_eq!(
            connector.peer(1).sent(),
            vec![r#"{"token":"fresh","type":"auth"}"#.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_reconnect_policy_gives_up() {
        let connector = FakeConnector::new();
        connector.refuse(true);
        let config = ClientConfig::new("http://localhost:9000").with_reconnect(ReconnectPolicy {
            backoff: Backoff::exponential(100, 2.0),
            max_attempts: Some(2),
        });
        let channel = EventChannel::new(&config, TokenStore::new(), connector.clone()).unwrap();
        let mut events = channel.open().await;

        while events.next().await.is_some() {}
        let connects = connector.connect_times();
        assert_eq!(connects.len(), 3);
        assert_eq!(connects[1] - connects[0], Duration::from_millis(100));
        assert_eq!(connects[2] - connects[1], Duration::from_millis(200));
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }
}
