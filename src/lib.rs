#![warn(missing_docs)]

//! # Agent API Client: resilient access to the agent platform
//!
//! This crate is the client side of the agent management platform's API. It
//! has two halves that share one session token:
//!
//! 1. **Requests** - JSON calls with per-attempt timeouts and retry with
//!    exponential backoff
//! 2. **Realtime channel** - a persistent WebSocket that authenticates on every
//!    connect and re-establishes itself after unexpected closes
//!
//! ## Key Features
//!
//! - **Path templates**: `/agents/{id}` style placeholders filled per call
//! - **Header merge**: content type, `x-api-key`, bearer token, caller overrides
//! - **Retry**: failed attempts repeat after 1s, 2s, 4s ... (configurable)
//! - **Single-attempt login**; logout clears the session even when it fails
//! - **Auth handshake**: `{"type":"auth","token":...}` first on every connection
//! - **Auto-reconnect**: fixed delay, cancelled by an explicit disconnect
//! - **Channel states**: `disconnected`, `connecting`, `authenticating`, `open`, `closing`
//!
//! ## Client Usage
//!
//! ```ignore
//! use agent_api_client::{ApiClient, ChannelEvent, RealtimeEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new()?;
//!     client.login("admin", "secret").await?;
//!
//!     let agents = client.agents().await?;
//!     println!("agents: {}", agents);
//!
//!     let mut events = client.connect().await;
//!     while let Some(event) = events.next().await {
//!         match event {
//!             ChannelEvent::Message(value) => {
//!                 if let Some(RealtimeEvent::AgentStatus { agent_id, status }) =
//!                     RealtimeEvent::from_value(&value)
//!                 {
//!                     println!("{} is now {}", agent_id, status);
//!                 }
//!             }
//!             ChannelEvent::State(state) => println!("channel {}", state),
//!             ChannelEvent::Error(e) => eprintln!("channel error: {}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[client]** - Request client, retry loop, endpoint wrappers
//! - **[channel]** - Realtime WebSocket channel
//! - **[config]** - Client configuration and policies
//! - **[backoff]** - Delay schedules shared by retry and reconnect
//! - **[error]** - Error types and result handling
//! - **[session]** - Signed-in user tracking

pub mod backoff;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use backoff::Backoff;
pub use channel::{
    AuthMessage, ChannelEvent, ChannelEvents, ChannelState, Connection, Connector, EventChannel,
    RealtimeEvent, WsConnector,
};
pub use client::{ApiClient, CallOptions, TokenStore};
pub use config::{ClientConfig, ReconnectPolicy, RetryPolicy};
pub use error::{ApiError, Result};
pub use session::{CurrentUser, Session};
