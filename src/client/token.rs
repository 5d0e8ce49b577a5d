//! Shared holder for the session's bearer token.

use parking_lot::RwLock;
use std::sync::Arc;

/// The current authentication token, shared between the request client and
/// the realtime channel.
///
/// Clones share the same slot. Only the [`ApiClient`](crate::ApiClient)
/// writes it; readers always see the value current at the time of the read.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<String> {
        self.slot.read().clone()
    }

    /// Whether a token is set.
    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }

    pub(crate) fn set(&self, token: impl Into<String>) {
        *self.slot.write() = Some(token.into());
    }

    pub(crate) fn clear(&self) -> Option<String> {
        self.slot.write().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_slot() {
        let store = TokenStore::new();
        let reader = store.clone();
        assert!(!reader.is_set());

        store.set("abc");
        assert_eq!(reader.get().as_deref(), Some("abc"));

        assert_eq!(store.clear().as_deref(), Some("abc"));
        assert_eq!(reader.get(), None);
    }
}
