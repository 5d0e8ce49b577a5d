//! Endpoint path templates of the platform API.
//!
//! Templates are relative to the configured base address; `{id}` is filled
//! from the call's parameters by [`resolve_path`](super::resolve_path).

#![allow(missing_docs)]

// Authentication
pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH: &str = "/auth/refresh";
pub const VERIFY: &str = "/auth/verify";

// Agents
pub const AGENTS_LIST: &str = "/agents";
pub const AGENT_DETAIL: &str = "/agents/{id}";
pub const AGENT_START: &str = "/agents/{id}/start";
pub const AGENT_STOP: &str = "/agents/{id}/stop";
pub const AGENT_STATS: &str = "/agents/{id}/stats";
pub const AGENT_CONFIG: &str = "/agents/{id}/config";

// Metrics
pub const METRICS_OVERVIEW: &str = "/metrics/overview";
pub const METRICS_REALTIME: &str = "/metrics/realtime";
pub const METRICS_HISTORY: &str = "/metrics/history";

// Activities
pub const ACTIVITIES_RECENT: &str = "/activities/recent";
pub const ACTIVITIES_SEARCH: &str = "/activities/search";

// Indexes
pub const INDEXES_LIST: &str = "/indexes";
pub const INDEX_DETAIL: &str = "/indexes/{id}";
pub const INDEX_SYNC: &str = "/indexes/{id}/sync";
pub const INDEX_DELETE: &str = "/indexes/{id}";

// Logs
pub const LOGS_STREAM: &str = "/logs/stream";
pub const LOGS_SEARCH: &str = "/logs/search";
pub const LOGS_EXPORT: &str = "/logs/export";

// Billing
pub const BILLING_USAGE: &str = "/billing/usage";
pub const BILLING_HISTORY: &str = "/billing/history";
pub const BILLING_INVOICE: &str = "/billing/invoices/{id}";

// Settings
pub const SETTINGS_GET: &str = "/settings";
pub const SETTINGS_UPDATE: &str = "/settings";

/// Realtime channel path
pub const WS_REALTIME: &str = "/ws/realtime";
