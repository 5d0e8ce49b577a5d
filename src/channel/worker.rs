//! Background task owning one channel's transport.
//!
//! The worker connects, performs the auth handshake, pumps frames in both
//! directions and reconnects on the configured schedule until it is told to
//! shut down. It is the only place a channel's transport ever lives, which is
//! what keeps a channel to one connection at a time.

use super::events::ChannelEvent;
use super::message::AuthMessage;
use super::state::ChannelState;
use super::transport::{Connection, Connector};
use crate::client::TokenStore;
use crate::config::ReconnectPolicy;
use crate::error::{ApiError, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub(super) struct Worker {
    pub url: String,
    pub connector: Arc<dyn Connector>,
    pub token: TokenStore,
    pub policy: ReconnectPolicy,
    pub state: watch::Sender<ChannelState>,
    pub events: mpsc::Sender<ChannelEvent>,
    pub outbound: mpsc::Receiver<String>,
    pub shutdown: watch::Receiver<bool>,
}

enum SessionEnd {
    Shutdown,
    Closed,
    Failed(ApiError),
}

struct Publisher {
    state: watch::Sender<ChannelState>,
    events: mpsc::Sender<ChannelEvent>,
}

impl Publisher {
    /// Record `next` and queue it for the consumer.
    async fn transition(&self, next: ChannelState, shutdown: &mut watch::Receiver<bool>) {
        let previous = self.state.send_replace(next);
        if previous == next {
            return;
        }
        debug!(from = %previous, to = %next, "channel state changed");
        self.publish(ChannelEvent::State(next), shutdown).await;
    }

    /// Queue `event`, waiting for room while the consumer is behind.
    ///
    /// Gives up only when shutdown is requested while the queue is full.
    async fn publish(&self, event: ChannelEvent, shutdown: &mut watch::Receiver<bool>) {
        let event = match self.events.try_send(event) {
            // A dropped consumer is not an error; the channel keeps running.
            Ok(()) | Err(TrySendError::Closed(_)) => return,
            Err(TrySendError::Full(event)) => event,
        };
        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => debug!("shutting down with a full event queue, event dropped"),
            _ = self.events.send(event) => {}
        }
    }
}

/// Resolves once shutdown has been requested or the channel handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl Worker {
    pub(super) async fn run(self) {
        let Worker {
            url,
            connector,
            token,
            policy,
            state,
            events,
            mut outbound,
            mut shutdown,
        } = self;
        let publisher = Publisher { state, events };
        let mut delays = policy.backoff.delays();
        let mut failures: u32 = 0;

        loop {
            publisher.transition(ChannelState::Connecting, &mut shutdown).await;
            let connected = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => {
                    publisher.transition(ChannelState::Closing, &mut shutdown).await;
                    break;
                }
                result = connector.connect(&url) => result,
            };

            match connected {
                Ok(mut conn) => match handshake(conn.as_mut(), &token, &publisher, &mut shutdown).await {
                    Ok(()) => {
                        discard_stale(&mut outbound);
                        publisher.transition(ChannelState::Open, &mut shutdown).await;
                        info!(url = %url, "channel open");
                        delays = policy.backoff.delays();
                        failures = 0;

                        match session(conn.as_mut(), &publisher, &mut outbound, &mut shutdown).await {
                            SessionEnd::Shutdown => {
                                publisher.transition(ChannelState::Closing, &mut shutdown).await;
                                if let Err(e) = conn.close().await {
                                    debug!("error while closing channel transport: {}", e);
                                }
                                break;
                            }
                            SessionEnd::Closed => info!(url = %url, "channel closed by peer"),
                            SessionEnd::Failed(e) => {
                                warn!(url = %url, "channel transport failed: {}", e);
                                publisher.publish(ChannelEvent::Error(e), &mut shutdown).await;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(url = %url, "channel handshake failed: {}", e);
                        publisher.publish(ChannelEvent::Error(e), &mut shutdown).await;
                    }
                },
                Err(e) => {
                    warn!(url = %url, "channel connect failed: {}", e);
                    publisher.publish(ChannelEvent::Error(e), &mut shutdown).await;
                }
            }
            publisher.transition(ChannelState::Disconnected, &mut shutdown).await;

            failures = failures.saturating_add(1);
            if let Some(max) = policy.max_attempts {
                if failures > max {
                    info!(url = %url, attempts = max, "channel reconnect attempts exhausted");
                    break;
                }
            }

            let delay = delays.next().unwrap_or_else(|| policy.backoff.initial_delay());
            info!(url = %url, "reconnecting channel in {:?}", delay);
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => {
                    publisher.transition(ChannelState::Closing, &mut shutdown).await;
                    break;
                }
                _ = sleep(delay) => {}
            }
        }

        publisher.transition(ChannelState::Disconnected, &mut shutdown).await;
    }
}

/// Send the auth message when a token is set. The token is read here, at
/// send time, so a login after `open()` is seen by the next connection.
async fn handshake(
    conn: &mut dyn Connection,
    token: &TokenStore,
    publisher: &Publisher,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    match token.get() {
        Some(token) => {
            publisher.transition(ChannelState::Authenticating, shutdown).await;
            conn.send_text(AuthMessage::new(token).to_json()).await?;
            debug!("channel auth handshake sent");
        }
        None => debug!("no session token, skipping channel handshake"),
    }
    Ok(())
}

/// Drop messages queued while the channel was not open.
fn discard_stale(outbound: &mut mpsc::Receiver<String>) {
    let mut dropped = 0usize;
    while outbound.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        warn!(dropped, "discarding outbound messages queued before the channel opened");
    }
}

async fn session(
    conn: &mut dyn Connection,
    publisher: &Publisher,
    outbound: &mut mpsc::Receiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = shutdown_requested(shutdown) => return SessionEnd::Shutdown,
            inbound = conn.next_text() => match inbound {
                Some(Ok(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => publisher.publish(ChannelEvent::Message(value), shutdown).await,
                    Err(e) => warn!(error = %e, "dropping malformed channel message"),
                },
                Some(Err(e)) => return SessionEnd::Failed(e),
                None => return SessionEnd::Closed,
            },
            Some(text) = outbound.recv() => {
                if !conn.is_ready() {
                    warn!("channel transport not ready, dropping outbound message");
                    continue;
                }
                if let Err(e) = conn.send_text(text).await {
                    return SessionEnd::Failed(e);
                }
            }
        }
    }
}
