//! In-memory connector for exercising the channel worker.

use super::transport::{Connection, Connector};
use crate::error::{ApiError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A frame the fake peer delivers to the client.
pub(crate) enum Frame {
    Text(String),
    Error(String),
    Close,
}

/// The server side of one fake connection.
#[derive(Clone)]
pub(crate) struct FakePeer {
    inbound: mpsc::UnboundedSender<Frame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl FakePeer {
    pub(crate) fn push(&self, frame: Frame) {
        let _ = self.inbound.send(frame);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub(crate) struct FakeConnector {
    refuse: AtomicBool,
    connects: Mutex<Vec<(Instant, String)>>,
    peers: Mutex<Vec<FakePeer>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent connection attempts fail.
    pub(crate) fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.connects.lock().len()
    }

    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().iter().map(|(at, _)| *at).collect()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.connects.lock().iter().map(|(_, url)| url.clone()).collect()
    }

    /// Peer of the `index`-th successful connection.
    pub(crate) fn peer(&self, index: usize) -> FakePeer {
        self.peers.lock()[index].clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        self.connects.lock().push((Instant::now(), url.to_string()));
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ApiError::Channel("connection refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let peer = FakePeer {
            inbound: tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let conn = FakeConnection {
            inbound: rx,
            sent: Arc::clone(&peer.sent),
            closed: Arc::clone(&peer.closed),
        };
        self.peers.lock().push(peer);
        Ok(Box::new(conn))
    }
}

struct FakeConnection {
    inbound: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ApiError::Channel("send on closed connection".into()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        match self.inbound.recv().await {
            Some(Frame::Text(text)) => Some(Ok(text)),
            Some(Frame::Error(e)) => Some(Err(ApiError::Channel(e))),
            Some(Frame::Close) | None => {
                self.closed.store(true, Ordering::SeqCst);
                None
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}
