//! Resilient request client.
//!
//! This module provides the JSON request side of the API client:
//!
//! - **Resolve path templates** with `{name}` placeholders
//! - **Merge headers**: content type, API key, bearer token, caller overrides
//! - **Bound every attempt** with the configured timeout
//! - **Retry failed attempts** with exponential backoff
//! - **Track the session token** set by login and cleared by logout
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── endpoints - Endpoint path templates
//! ├── fetch     - ApiClient and the retry loop
//! ├── headers   - Request header assembly
//! ├── resources - Typed endpoint wrappers
//! ├── token     - Shared session token holder
//! ├── transport - HttpTransport seam and reqwest implementation
//! └── utils     - Path substitution and URL helpers
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ApiClient`] | Main client: calls, login/logout, realtime channel |
//! | [`CallOptions`] | Per-call parameters, body, headers, retry switch |
//! | [`RequestHeaders`] | Header merge builder |
//! | [`TokenStore`] | Session token shared with the channel |
//! | [`HttpTransport`] | Attempt execution seam |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use agent_api_client::{ApiClient, ClientConfig, RetryPolicy, Backoff};
//!
//! // Default configuration
//! let client = ApiClient::new().unwrap();
//!
//! // Custom configuration
//! let config = ClientConfig::new("http://localhost:8080/v1").with_retry(RetryPolicy {
//!     max_attempts: 5,
//!     backoff: Backoff::exponential(2000, 2.0),
//! });
//! let client = ApiClient::with_config(config).unwrap();
//! assert_eq!(client.config().retry.max_attempts, 5);
//! ```
//!
//! ## Resolving Paths
//!
//! ```
//! use agent_api_client::client::{endpoints, resolve_path};
//! use std::collections::HashMap;
//!
//! let params = HashMap::from([("id".to_string(), "IDX-7".to_string())]);
//! assert_eq!(resolve_path(endpoints::INDEX_SYNC, &params), "/indexes/IDX-7/sync");
//! ```

pub mod endpoints;
mod fetch;
mod headers;
mod resources;
mod token;
mod transport;
mod utils;

pub use fetch::{ApiClient, CallOptions};
pub use headers::{RequestHeaders, API_KEY_HEADER};
pub use token::TokenStore;
pub use transport::{HttpTransport, PreparedRequest, ReqwestTransport, TransportResponse};
pub use utils::*;
