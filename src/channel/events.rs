//! Consumer side of the realtime channel.
//!
//! The channel worker publishes everything it observes onto one queue:
//! state transitions, parsed inbound messages and transport errors. The
//! consumer drains it through [`ChannelEvents`].
//!
//! # Examples
//!
//! ## Draining events
//!
//! ```ignore
//! use agent_api_client::{ApiClient, ChannelEvent};
//!
//! let mut events = client.connect().await;
//! while let Some(event) = events.next().await {
//!     match event {
//!         ChannelEvent::Message(value) => println!("update: {}", value),
//!         ChannelEvent::Error(e) => eprintln!("channel error: {}", e),
//!         ChannelEvent::State(state) => println!("channel is {}", state),
//!     }
//! }
//! ```
//!
//! ## Using callbacks
//!
//! ```ignore
//! let events = client.connect().await;
//! events.dispatch(
//!     |value| println!("update: {}", value),
//!     |error| eprintln!("channel error: {}", error),
//! );
//! ```

use super::state::ChannelState;
use crate::error::ApiError;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One observation published by the channel worker.
#[derive(Debug)]
pub enum ChannelEvent {
    /// The channel moved to a new state
    State(ChannelState),
    /// A parsed inbound message
    Message(Value),
    /// The transport failed; a reconnect follows unless the channel was closed
    Error(ApiError),
}

/// Stream of [`ChannelEvent`]s for one `open()` of the channel.
///
/// Survives reconnects: every connection made on behalf of the same `open()`
/// publishes here. Ends once the channel is closed or dropped.
pub struct ChannelEvents {
    receiver: mpsc::Receiver<ChannelEvent>,
}

impl ChannelEvents {
    /// Wrap the receiving half of the worker's queue.
    pub fn new(receiver: mpsc::Receiver<ChannelEvent>) -> Self {
        ChannelEvents { receiver }
    }

    /// Receive the next event.
    ///
    /// Returns `None` when the channel has shut down.
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.receiver.recv().await
    }

    /// Take an already-queued event without waiting.
    pub fn try_next(&mut self) -> Option<ChannelEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive the next inbound message, skipping state changes and errors.
    pub async fn next_message(&mut self) -> Option<Value> {
        while let Some(event) = self.receiver.recv().await {
            if let ChannelEvent::Message(value) = event {
                return Some(value);
            }
        }
        None
    }

    /// Drain the stream on a background task, invoking `on_message` for every
    /// inbound message and `on_error` for every transport error.
    pub fn dispatch<M, E>(mut self, mut on_message: M, mut on_error: E) -> JoinHandle<()>
    where
        M: FnMut(Value) + Send + 'static,
        E: FnMut(ApiError) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(event) = self.receiver.recv().await {
                match event {
                    ChannelEvent::Message(value) => on_message(value),
                    ChannelEvent::Error(e) => on_error(e),
                    ChannelEvent::State(_) => {}
                }
            }
        })
    }
}

impl Stream for ChannelEvents {
    type Item = ChannelEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_next_message_skips_other_events() {
        let (tx, rx) = mpsc::channel(10);
        let mut events = ChannelEvents::new(rx);

        tx.send(ChannelEvent::State(ChannelState::Open)).await.unwrap();
        tx.send(ChannelEvent::Error(ApiError::Channel("reset".into()))).await.unwrap();
        tx.send(ChannelEvent::Message(json!({ "type": "log_entry" }))).await.unwrap();
        drop(tx);

        assert_eq!(events.next_message().await, Some(json!({ "type": "log_entry" })));
        assert!(events.next_message().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_impl() {
        let (tx, rx) = mpsc::channel(10);
        tx.send(ChannelEvent::State(ChannelState::Connecting)).await.unwrap();
        drop(tx);

        let collected: Vec<_> = ChannelEvents::new(rx).collect().await;
        assert!(matches!(collected[..], [ChannelEvent::State(ChannelState::Connecting)]));
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_callbacks() {
        let (tx, rx) = mpsc::channel(10);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let messages = messages.clone();
            let errors = errors.clone();
            ChannelEvents::new(rx).dispatch(
                move |value| messages.lock().unwrap().push(value),
                move |error| errors.lock().unwrap().push(error.to_string()),
            )
        };

        tx.send(ChannelEvent::Message(json!(1))).await.unwrap();
        tx.send(ChannelEvent::State(ChannelState::Disconnected)).await.unwrap();
        tx.send(ChannelEvent::Error(ApiError::Channel("boom".into()))).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*messages.lock().unwrap(), vec![json!(1)]);
        assert_eq!(*errors.lock().unwrap(), vec!["Channel error: boom".to_string()]);
    }
}
