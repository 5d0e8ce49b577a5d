//! Main API client implementation.
//!
//! Provides the primary [`ApiClient`] for making JSON requests with retry and
//! for owning the session's realtime channel.
//!
//! # Examples
//!
//! ## Simple call
//!
//! ```ignore
//! use agent_api_client::{ApiClient, CallOptions};
//! use reqwest::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new()?;
//!     let agent = client
//!         .call(Method::GET, "/agents/{id}", CallOptions::new().param("id", "AGT-001"))
//!         .await?;
//!     println!("{}", agent);
//!     Ok(())
//! }
//! ```
//!
//! ## Login, then listen for realtime events
//!
//! ```ignore
//! use agent_api_client::{ApiClient, ChannelEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new()?;
//!     client.login("admin", "secret").await?;
//!
//!     let mut events = client.connect().await;
//!     while let Some(event) = events.next().await {
//!         if let ChannelEvent::Message(value) = event {
//!             println!("update: {}", value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::channel::{ChannelEvents, Connector, EventChannel, WsConnector};
use crate::client::endpoints;
use crate::client::headers::RequestHeaders;
use crate::client::token::TokenStore;
use crate::client::transport::{HttpTransport, PreparedRequest, ReqwestTransport};
use crate::client::utils::{build_url, is_success_status, resolve_path};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, timeout};

/// Per-call options for [`ApiClient::call`].
///
/// Retries are enabled unless [`no_retry`](Self::no_retry) is used.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Values for the path template's `{name}` placeholders
    pub params: HashMap<String, String>,
    /// JSON payload; `None` sends no body at all
    pub body: Option<Value>,
    /// Caller headers, applied last
    pub headers: Vec<(String, String)>,
    /// Query string pairs
    pub query: Vec<(String, String)>,
    /// Whether the retry policy applies to this call
    pub retry: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        CallOptions {
            params: HashMap::new(),
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
            retry: true,
        }
    }
}

impl CallOptions {
    /// No parameters, no body, retries enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the `{name}` placeholder with `value`.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Send `body` as the JSON payload.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a caller header; it overrides any default of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a query string pair.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Make exactly one attempt regardless of the retry policy.
    pub fn no_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

/// The platform API client
///
/// Issues JSON requests against the configured base address and owns the
/// session token and the realtime [`EventChannel`].
///
/// # Features
///
/// - `{name}` path substitution
/// - Per-attempt timeout
/// - Bounded retry with exponential backoff
/// - Bearer token captured on login, dropped on logout
/// - Realtime channel sharing the same token
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    token: TokenStore,
    channel: Arc<EventChannel>,
}

impl ApiClient {
    /// Create a client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with a custom configuration, using reqwest for requests
    /// and tokio-tungstenite for the realtime channel
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transports(config, Arc::new(transport), Arc::new(WsConnector::new()))
    }

    /// Create a client over caller-supplied transports
    pub fn with_transports(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;
        let token = TokenStore::new();
        let channel = EventChannel::new(&config, token.clone(), connector)?;

        Ok(ApiClient {
            transport,
            config: Arc::new(config),
            token,
            channel: Arc::new(channel),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session token
    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    /// Replace the session token
    pub fn set_token(&self, token: impl Into<String>) {
        self.token.set(token);
    }

    /// Forget the session token
    pub fn clear_token(&self) {
        self.token.clear();
    }

    /// Shared token holder, for components that need to observe it
    pub fn token_store(&self) -> &TokenStore {
        &self.token
    }

    /// The realtime channel owned by this client
    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    /// Open the realtime channel, replacing any connection already open
    pub async fn connect(&self) -> ChannelEvents {
        self.channel.open().await
    }

    /// Close the realtime channel and cancel any pending reconnect
    pub async fn disconnect(&self) {
        self.channel.disconnect().await;
    }

    /// Make a JSON call
    ///
    /// Resolves `template` against `options.params`, then makes up to
    /// `retry.max_attempts` attempts (one when `options.retry` is false),
    /// sleeping the backoff delay between attempts. Non-2xx responses,
    /// timeouts and transport errors all count as failed attempts, as does a
    /// 2xx body that is not valid JSON.
    ///
    /// An empty or whitespace-only 2xx body is returned as `Value::Null`
    /// rather than treated as a decode failure, so a `204 No Content` (or an
    /// empty `200`) succeeds on the first attempt instead of being retried.
    ///
    /// # Errors
    ///
    /// [`ApiError::RetriesExhausted`] holding the final attempt's failure, or
    /// a preparation error (bad URL, header or body) before any attempt.
    pub async fn call(&self, method: Method, template: &str, options: CallOptions) -> Result<Value> {
        let path = resolve_path(template, &options.params);
        let url = build_url(&self.config.base_url, &path, &options.query)?;
        let body = match &options.body {
            Some(value) => Some(Bytes::from(serde_json::to_vec(value)?)),
            None => None,
        };

        let max_attempts = if options.retry {
            self.config.retry.max_attempts.max(1)
        } else {
            1
        };
        let mut attempt = 1;

        loop {
            // Headers are rebuilt per attempt so a token change is picked up.
            let headers = RequestHeaders::new()
                .with_api_key(self.config.api_key.as_str())
                .with_bearer(self.token.get())
                .with_headers(options.headers.iter().cloned())
                .build()?;
            let request = PreparedRequest {
                method: method.clone(),
                url: url.clone(),
                headers,
                body: body.clone(),
            };

            tracing::debug!(%method, %url, attempt, "sending request");
            match self.attempt(request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.retry.backoff.delay_for(attempt - 1);
                    if self.config.enable_logging {
                        tracing::warn!(
                            "Request {} {} failed (attempt {}/{}), retrying after {:?}: {}",
                            method,
                            path,
                            attempt,
                            max_attempts,
                            delay,
                            e
                        );
                    }
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    if self.config.enable_logging {
                        tracing::warn!(
                            "Request {} {} failed after {} attempt(s): {}",
                            method,
                            path,
                            attempt,
                            e
                        );
                    }
                    return Err(ApiError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Make a JSON call and deserialize the response into `T`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: Method,
        template: &str,
        options: CallOptions,
    ) -> Result<T> {
        let value = self.call(method, template, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Log in with a single attempt
    ///
    /// When the response carries a string `token` field it becomes the session
    /// token, so later calls send `Authorization: Bearer <token>`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let response = self
            .call(
                Method::POST,
                endpoints::LOGIN,
                CallOptions::new()
                    .body(json!({ "username": username, "password": password }))
                    .no_retry(),
            )
            .await?;

        if let Some(token) = response.get("token").and_then(Value::as_str) {
            self.token.set(token);
            tracing::info!(username, "session token stored");
        }

        Ok(response)
    }

    /// Log out
    ///
    /// The token is cleared and the realtime channel closed whether or not the
    /// remote call succeeds; the remote call's outcome is returned afterwards.
    pub async fn logout(&self) -> Result<Value> {
        let _cleanup = SessionCleanup {
            token: &self.token,
            channel: &self.channel,
        };

        let outcome = self.call(Method::POST, endpoints::LOGOUT, CallOptions::new()).await;
        if let Err(e) = &outcome {
            tracing::warn!("logout request failed, clearing session anyway: {}", e);
        }

        self.token.clear();
        self.channel.disconnect().await;
        outcome
    }

    /// One attempt, bounded by the request timeout
    async fn attempt(&self, request: PreparedRequest) -> Result<Value> {
        let limit = self.config.request_timeout();
        let response = match timeout(limit, self.transport.execute(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout(limit)),
        };

        if !is_success_status(response.status) {
            let reason = StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default();
            return Err(ApiError::Status {
                status: response.status,
                reason: reason.to_string(),
            });
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Clears the session when a logout ends, including when the logout future is dropped.
struct SessionCleanup<'a> {
    token: &'a TokenStore,
    channel: &'a EventChannel,
}

impl Drop for SessionCleanup<'_> {
    fn drop(&mut self) {
        self.token.clear();
        self.channel.close_now();
    }
}
