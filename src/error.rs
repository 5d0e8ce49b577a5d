//! Error types for the agent API client.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type is
//! [`ApiError`]. Request failures are local to one call; channel failures are
//! published on the channel's event stream and never end the channel on their own.
//!
//! # Attempt failures
//!
//! | Variant | Raised when | Retried |
//! |---------|-------------|---------|
//! | [`ApiError::Transport`] | Connection, DNS or I/O failure | yes |
//! | [`ApiError::Timeout`] | An attempt outlived the per-request timeout | yes |
//! | [`ApiError::Status`] | The server answered with a non-2xx status | yes |
//! | [`ApiError::Json`] | The response body was not valid JSON | yes |
//!
//! Once the final attempt fails, the caller receives
//! [`ApiError::RetriesExhausted`] holding only that last failure.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the request client and the event channel.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure during one attempt.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// An attempt did not settle within the per-request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request completed with a non-success status code.
    #[error("HTTP {status}: {reason}")]
    Status {
        /// Numeric status code
        status: u16,
        /// Canonical reason phrase, or empty when unknown
        reason: String,
    },

    /// A payload could not be serialized or a response could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base address or a resolved path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A header name or value was rejected.
    #[error("Invalid header: {0}")]
    Header(String),

    /// The client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failure on the realtime channel's transport.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Every permitted attempt failed; carries the most recent failure only.
    #[error("Request failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The failure of the final attempt
        #[source]
        last: Box<ApiError>,
    },
}

impl ApiError {
    /// Whether this failure counts as a failed attempt that the retry policy may repeat.
    ///
    /// Transport failures, timeouts, non-success statuses and undecodable bodies
    /// all qualify. Errors raised while preparing the request do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_)
                | ApiError::Timeout(_)
                | ApiError::Status { .. }
                | ApiError::Json(_)
        )
    }

    /// The failure of the final attempt, unwrapping [`ApiError::RetriesExhausted`].
    pub fn last_failure(&self) -> &ApiError {
        match self {
            ApiError::RetriesExhausted { last, .. } => last,
            other => other,
        }
    }

    /// The HTTP status of the last attempt, if it completed with one.
    pub fn status(&self) -> Option<u16> {
        match self.last_failure() {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ApiError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ApiError::Channel(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
