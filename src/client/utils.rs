//! Helpers for turning a path template into a request URL.
//!
//! - `{name}` placeholder substitution
//! - Base address + path joining with query parameters
//! - Status code classification

use crate::error::Result;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern compiles"))
}

/// Substitute every `{name}` placeholder in `template` with `params[name]`.
///
/// Placeholders with no matching parameter are left untouched; callers are
/// expected to supply every parameter their template names.
///
/// # Examples
///
/// ```
/// use agent_api_client::client::resolve_path;
/// use std::collections::HashMap;
///
/// let params = HashMap::from([("id".to_string(), "AGT-001".to_string())]);
/// assert_eq!(resolve_path("/agents/{id}", &params), "/agents/AGT-001");
/// assert_eq!(resolve_path("/agents/{id}/stats", &HashMap::new()), "/agents/{id}/stats");
/// ```
pub fn resolve_path(template: &str, params: &HashMap<String, String>) -> String {
    if params.is_empty() {
        return template.to_string();
    }
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Append `path` to `base` verbatim and attach `query` pairs.
///
/// Unlike [`Url::join`], a path prefix on the base address (such as `/v1`)
/// is kept.
pub fn build_url(base: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
    let base = base.trim_end_matches('/');
    let mut url = if path.starts_with('/') {
        Url::parse(&format!("{}{}", base, path))?
    } else {
        Url::parse(&format!("{}/{}", base, path))?
    };
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Check if status code indicates success (2xx)
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}
