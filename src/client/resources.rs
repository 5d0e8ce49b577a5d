//! Typed wrappers for the platform's endpoints.
//!
//! Each wrapper is a thin [`ApiClient::call`] with the endpoint's template,
//! parameters and payload filled in. Read-only endpoints that take filters
//! send them as query parameters.

use super::endpoints;
use super::fetch::{ApiClient, CallOptions};
use super::utils::build_url;
use crate::error::Result;
use reqwest::Method;
use serde_json::{json, Map, Value};
use url::Url;

impl ApiClient {
    /// Refresh the session token; a returned `token` replaces the current one
    pub async fn refresh_token(&self) -> Result<Value> {
        let response = self.call(Method::POST, endpoints::REFRESH, CallOptions::new()).await?;
        if let Some(token) = response.get("token").and_then(Value::as_str) {
            self.set_token(token);
        }
        Ok(response)
    }

    /// Check that the current token is still accepted
    pub async fn verify_token(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::VERIFY, CallOptions::new()).await
    }

    // ========== AGENTS ==========

    /// List agents
    pub async fn agents(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::AGENTS_LIST, CallOptions::new()).await
    }

    /// Get one agent
    pub async fn agent(&self, id: &str) -> Result<Value> {
        self.call(Method::GET, endpoints::AGENT_DETAIL, by_id(id)).await
    }

    /// Start an agent
    pub async fn start_agent(&self, id: &str) -> Result<Value> {
        self.call(Method::POST, endpoints::AGENT_START, by_id(id)).await
    }

    /// Stop an agent
    pub async fn stop_agent(&self, id: &str) -> Result<Value> {
        self.call(Method::POST, endpoints::AGENT_STOP, by_id(id)).await
    }

    /// Usage statistics of an agent over `time_range` (e.g. `24h`)
    pub async fn agent_stats(&self, id: &str, time_range: &str) -> Result<Value> {
        self.call(
            Method::GET,
            endpoints::AGENT_STATS,
            by_id(id).query("timeRange", time_range),
        )
        .await
    }

    /// Replace an agent's configuration
    pub async fn update_agent_config(&self, id: &str, config: Value) -> Result<Value> {
        self.call(Method::PUT, endpoints::AGENT_CONFIG, by_id(id).body(config))
            .await
    }

    // ========== METRICS ==========

    /// Dashboard metric summary
    pub async fn metrics_overview(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::METRICS_OVERVIEW, CallOptions::new())
            .await
    }

    /// Current metric values
    pub async fn realtime_metrics(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::METRICS_REALTIME, CallOptions::new())
            .await
    }

    /// Metric history over `time_range`, bucketed by `interval`
    pub async fn metrics_history(&self, time_range: &str, interval: &str) -> Result<Value> {
        self.call(
            Method::GET,
            endpoints::METRICS_HISTORY,
            CallOptions::new()
                .query("timeRange", time_range)
                .query("interval", interval),
        )
        .await
    }

    // ========== ACTIVITIES ==========

    /// Most recent activity rows
    pub async fn recent_activities(&self, limit: u32) -> Result<Value> {
        self.call(
            Method::GET,
            endpoints::ACTIVITIES_RECENT,
            CallOptions::new().query("limit", limit.to_string()),
        )
        .await
    }

    /// Search activities; `filters` fields are merged next to `query`
    pub async fn search_activities(&self, query: &str, filters: Map<String, Value>) -> Result<Value> {
        self.call(
            Method::POST,
            endpoints::ACTIVITIES_SEARCH,
            CallOptions::new().body(with_fields("query", query, filters)),
        )
        .await
    }

    // ========== INDEXES ==========

    /// List indexes
    pub async fn indexes(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::INDEXES_LIST, CallOptions::new()).await
    }

    /// Get one index
    pub async fn index(&self, id: &str) -> Result<Value> {
        self.call(Method::GET, endpoints::INDEX_DETAIL, by_id(id)).await
    }

    /// Trigger an index sync
    pub async fn sync_index(&self, id: &str) -> Result<Value> {
        self.call(Method::POST, endpoints::INDEX_SYNC, by_id(id)).await
    }

    /// Delete an index
    pub async fn delete_index(&self, id: &str) -> Result<Value> {
        self.call(Method::DELETE, endpoints::INDEX_DELETE, by_id(id)).await
    }

    // ========== LOGS ==========

    /// Address of the server-sent log stream, with `filters` as query pairs
    ///
    /// Consuming the stream is left to an event-source client.
    pub fn log_stream_url(&self, filters: &[(String, String)]) -> Result<Url> {
        build_url(&self.config().base_url, endpoints::LOGS_STREAM, filters)
    }

    /// Search logs; `filters` fields are merged next to `query`
    pub async fn search_logs(&self, query: &str, filters: Map<String, Value>) -> Result<Value> {
        self.call(
            Method::POST,
            endpoints::LOGS_SEARCH,
            CallOptions::new().body(with_fields("query", query, filters)),
        )
        .await
    }

    /// Request a log export in `format`; the response may carry a `downloadUrl`
    pub async fn export_logs(&self, format: &str, filters: Map<String, Value>) -> Result<Value> {
        self.call(
            Method::POST,
            endpoints::LOGS_EXPORT,
            CallOptions::new().body(with_fields("format", format, filters)),
        )
        .await
    }

    // ========== BILLING ==========

    /// Current billing period usage
    pub async fn billing_usage(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::BILLING_USAGE, CallOptions::new()).await
    }

    /// Past invoices
    pub async fn billing_history(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::BILLING_HISTORY, CallOptions::new())
            .await
    }

    /// One invoice; the response may carry a `downloadUrl`
    pub async fn invoice(&self, id: &str) -> Result<Value> {
        self.call(Method::GET, endpoints::BILLING_INVOICE, by_id(id)).await
    }

    // ========== SETTINGS ==========

    /// Account settings
    pub async fn settings(&self) -> Result<Value> {
        self.call(Method::GET, endpoints::SETTINGS_GET, CallOptions::new()).await
    }

    /// Replace account settings
    pub async fn update_settings(&self, settings: Value) -> Result<Value> {
        self.call(
            Method::PUT,
            endpoints::SETTINGS_UPDATE,
            CallOptions::new().body(settings),
        )
        .await
    }
}

fn by_id(id: &str) -> CallOptions {
    CallOptions::new().param("id", id)
}

/// `{ key: value, ...filters }`; `key` wins over a filter of the same name.
fn with_fields(key: &str, value: &str, mut filters: Map<String, Value>) -> Value {
    filters.insert(key.to_string(), json!(value));
    Value::Object(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_fields_merges_filters() {
        let mut filters = Map::new();
        filters.insert("level".into(), json!("error"));
        filters.insert("query".into(), json!("shadowed"));

        let body = with_fields("query", "timeout", filters);
        assert_eq!(body, json!({ "query": "timeout", "level": "error" }));
    }

    #[test]
    fn test_log_stream_url() {
        let client = ApiClient::with_config(crate::ClientConfig::new("http://localhost:8080/v1")).unwrap();
        let url = client
            .log_stream_url(&[("level".to_string(), "warn".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v1/logs/stream?level=warn");
    }
}
