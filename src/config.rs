//! Client configuration.
//!
//! A [`ClientConfig`] is supplied once when the client is built and never
//! mutated afterwards. Every field has a literal default, so partial
//! configurations can be deserialized with the rest filled in.
//!
//! | Setting | Default |
//! |---------|---------|
//! | `base_url` | `https://api.externai.com/v1` |
//! | `request_timeout_ms` | `10000` |
//! | `retry.max_attempts` | `3` |
//! | `retry.backoff` | 1000 ms, ×2 |
//! | `reconnect.backoff` | 5000 ms, fixed |
//! | `channel_path` | `/ws/realtime` |

use crate::backoff::Backoff;
use crate::client::endpoints;
use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const API_URL_ENV: &str = "API_URL";
/// Environment variable overriding [`ClientConfig::api_key`].
pub const API_KEY_ENV: &str = "API_KEY";

/// Retry policy for single-shot requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per call, first attempt included
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Check `max_attempts >= 1` and a strictly growing backoff.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ApiError::Config("retry max_attempts must be at least 1".into()));
        }
        self.backoff.validate()?;
        if self.backoff.multiplier <= 1.0 {
            return Err(ApiError::Config(format!(
                "retry backoff multiplier must be greater than 1, got {}",
                self.backoff.multiplier
            )));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::exponential(1000, 2.0),
        }
    }
}

/// Reconnect policy for the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay schedule between connection attempts
    pub backoff: Backoff,
    /// Give up after this many consecutive failed connections; `None` retries forever
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Never reconnect after the first connection ends.
    pub fn disabled() -> Self {
        ReconnectPolicy {
            max_attempts: Some(0),
            ..Default::default()
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            backoff: Backoff::fixed(5000),
            max_attempts: None,
        }
    }
}

/// Configuration shared by the request client and the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address every request path is appended to
    pub base_url: String,
    /// Static key sent as `X-API-Key` on every request
    pub api_key: String,
    /// Timeout for one request attempt, in milliseconds
    pub request_timeout_ms: u64,
    /// Request retry policy
    pub retry: RetryPolicy,
    /// Channel reconnect policy
    pub reconnect: ReconnectPolicy,
    /// Path of the realtime channel, appended to the streaming base address
    pub channel_path: String,
    /// Capacity of the channel's event queue
    pub event_buffer: usize,
    /// Emit retry warnings
    pub enable_logging: bool,
    /// Optional proxy for HTTP requests; empty means none
    pub proxy_url: String,
    /// Idle pooled connections kept per host
    pub max_idle_connections: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "https://api.externai.com/v1".to_string(),
            api_key: "your-api-key-here".to_string(),
            request_timeout_ms: 10_000,
            retry: RetryPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            channel_path: endpoints::WS_REALTIME.to_string(),
            event_buffer: 256,
            enable_logging: true,
            proxy_url: String::new(),
            max_idle_connections: 16,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Default configuration with `API_URL` and `API_KEY` applied when set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `API_URL` and `API_KEY` from the environment on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Replace the request retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the channel reconnect policy.
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check every field for values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.request_timeout_ms == 0 {
            return Err(ApiError::Config("request_timeout_ms must be positive".into()));
        }
        if self.event_buffer == 0 {
            return Err(ApiError::Config("event_buffer must be positive".into()));
        }
        self.retry.validate()?;
        self.reconnect.backoff.validate()?;
        Ok(())
    }

    /// Realtime channel address: the base address with its scheme swapped to
    /// `ws`/`wss`, followed by the channel path.
    pub fn channel_url(&self) -> Result<String> {
        let base = self.base_url.trim_end_matches('/');
        let streaming = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if base.starts_with("ws://") || base.starts_with("wss://") {
            base.to_string()
        } else {
            return Err(ApiError::Config(format!(
                "base url {} has no http(s) scheme to derive a channel address from",
                self.base_url
            )));
        };
        let url = format!("{}{}", streaming, self.channel_path);
        url::Url::parse(&url)?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_literals() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff.initial_delay_ms, 1000);
        assert_eq!(config.retry.backoff.multiplier, 2.0);
        assert_eq!(config.reconnect.backoff, Backoff::fixed(5000));
        assert_eq!(config.reconnect.max_attempts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channel_url_swaps_scheme() {
        let config = ClientConfig::new("https://api.example.com/v1");
        assert_eq!(config.channel_url().unwrap(), "wss://api.example.com/v1/ws/realtime");

        let config = ClientConfig::new("http://localhost:8080/");
        assert_eq!(config.channel_url().unwrap(), "ws://localhost:8080/ws/realtime");

        let config = ClientConfig::new("ftp://example.com");
        assert!(config.channel_url().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "http://localhost:9000", "retry": {"max_attempts": 5, "backoff": {"initial_delay_ms": 10, "multiplier": 3.0}}}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff.max_delay_ms, None);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.channel_path, "/ws/realtime");
    }

    #[test]
    fn test_validate_rejects_bad_retry_policy() {
        let config = ClientConfig::default().with_retry(RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        });
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));

        let config = ClientConfig::default().with_retry(RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::fixed(100),
        });
        assert!(config.validate().is_err());

        assert!(ClientConfig::new("not a url").validate().is_err());
    }

    #[test]
    fn test_single_attempt_policy() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
        assert_eq!(ReconnectPolicy::disabled().max_attempts, Some(0));
    }
}
