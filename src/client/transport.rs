//! HTTP transport seam.
//!
//! The request client hands fully prepared requests to an [`HttpTransport`]
//! and gets back the raw status and body. [`ReqwestTransport`] is the
//! production implementation; tests substitute scripted transports.

use crate::config::ClientConfig;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::time::Duration;
use url::Url;

/// One fully resolved request attempt.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL, path substituted and query attached
    pub url: Url,
    /// Merged headers
    pub headers: HeaderMap,
    /// Serialized JSON payload, absent when the call has no body
    pub body: Option<Bytes>,
}

/// Status and body of a completed attempt.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Numeric status code
    pub status: u16,
    /// Raw response body
    pub body: Bytes,
}

/// Executes one request attempt.
///
/// Implementations report network failures as
/// [`ApiError::Transport`](crate::ApiError::Transport) and return every
/// completed response, whatever its status.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and read the whole response body.
    async fn execute(&self, request: PreparedRequest) -> Result<TransportResponse>;
}

/// [`HttpTransport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the underlying client from the pool and proxy settings.
    ///
    /// Timeouts are enforced per attempt by the request client, so the
    /// reqwest client itself carries none.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_idle_connections as usize);

        if !config.proxy_url.is_empty() {
            builder = builder.proxy(reqwest::Proxy::all(&config.proxy_url)?);
        }

        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<TransportResponse> {
        let mut req_builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(TransportResponse { status, body })
    }
}
