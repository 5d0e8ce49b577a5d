//! Signed-in user tracking on top of [`ApiClient`].

use crate::client::ApiClient;
use crate::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_ROLE: &str = "admin";

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Login name
    pub username: String,
    /// Role granted by the platform
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl CurrentUser {
    /// User described by a login response.
    ///
    /// Uses the response's `user` object when it has one; otherwise the
    /// submitted username with the default role.
    pub fn from_login(response: &Value, submitted: &str) -> Self {
        response
            .get("user")
            .and_then(|user| serde_json::from_value(user.clone()).ok())
            .unwrap_or_else(|| CurrentUser {
                username: submitted.to_string(),
                role: default_role(),
            })
    }
}

/// An [`ApiClient`] plus the user it is signed in as.
#[derive(Clone)]
pub struct Session {
    client: ApiClient,
    user: Arc<RwLock<Option<CurrentUser>>>,
}

impl Session {
    /// Wrap `client`; nobody is signed in yet.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: Arc::new(RwLock::new(None)),
        }
    }

    /// The wrapped client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.user.read().clone()
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    /// Sign in and remember the user.
    ///
    /// A failed login leaves any previous user in place.
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser> {
        let response = self.client.login(username, password).await?;
        let user = CurrentUser::from_login(&response, username);
        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    /// Sign out; the user is forgotten even when the remote call fails.
    pub async fn logout(&self) -> Result<Value> {
        self.user.write().take();
        self.client.logout().await
    }
}
