//! WebSocket transport layer for the realtime channel.
//!
//! Single responsibility: connect to an address and exchange text frames.
//! No knowledge of authentication, reconnection or message contents; the
//! channel worker layers those on top.

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// Opens connections for the channel worker.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url`, returning once the transport reports itself connected.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>>;
}

/// A live, bidirectional text connection.
#[async_trait]
pub trait Connection: Send {
    /// Transmit one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound text frame.
    ///
    /// Returns `None` once the peer has closed the connection. Must be
    /// cancel-safe: the worker races it against outbound traffic.
    async fn next_text(&mut self) -> Option<Result<String>>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport can accept outbound frames right now.
    fn is_ready(&self) -> bool {
        true
    }
}

/// [`Connector`] over `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a connector.
    pub fn new() -> Self {
        WsConnector
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        debug!(url = %url, "Connecting to WebSocket");

        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| ApiError::Channel(format!("WebSocket connect failed: {}", e)))?;

        debug!(url = %url, "WebSocket connected");
        Ok(Box::new(WsConnection { ws, closed: false }))
    }
}

/// A connected WebSocket.
pub struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| ApiError::Channel(format!("Failed to send: {}", e)))
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(data))) => {
                    return Some(Ok(String::from_utf8_lossy(&data).into_owned()))
                }
                Some(Ok(Message::Close(_))) => {
                    self.closed = true;
                    return None;
                }
                // Pong is handled automatically by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Some(Err(ApiError::Channel(format!("WebSocket error: {}", e))))
                }
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.ws.close(None).await?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.closed
    }
}
