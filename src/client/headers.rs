//! Request header assembly.
//!
//! Headers are merged in a fixed order, later entries replacing earlier ones
//! with the same (case-insensitive) name:
//!
//! | Order | Header | Present |
//! |-------|--------|---------|
//! | 1 | `Content-Type: application/json` | always |
//! | 2 | `X-API-Key: <key>` | when a key is configured |
//! | 3 | `Authorization: Bearer <token>` | when a token is set |
//! | 4 | caller headers | as supplied |
//!
//! # Examples
//!
//! ```
//! use agent_api_client::client::RequestHeaders;
//!
//! let headers = RequestHeaders::new()
//!     .with_api_key("key")
//!     .with_bearer(Some("jwt".to_string()))
//!     .with_header("X-Request-Id", "42")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(headers["authorization"], "Bearer jwt");
//! assert_eq!(headers["x-request-id"], "42");
//! ```

use crate::error::{ApiError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// Name of the static API key header.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Builder for the headers of one request.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    api_key: Option<String>,
    bearer: Option<String>,
    custom: Vec<(String, String)>,
}

impl RequestHeaders {
    /// Empty builder; `build()` still adds the JSON content type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `key` as `X-API-Key`. Empty keys are skipped.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Send `Authorization: Bearer <token>` when `token` is set.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    /// Add one caller header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.push((name.into(), value.into()));
        self
    }

    /// Add caller headers in iteration order.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.custom
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Produce the merged header map.
    pub fn build(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(key)?);
        }
        if let Some(token) = &self.bearer {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
        }
        for (name, value) in &self.custom {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Header(format!("{}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ApiError::Header(e.to_string()))
}
