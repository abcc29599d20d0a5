//! Client configuration.

use opsdash_core::ApiUrl;

use crate::endpoints::{LOGIN_PATH, REFRESH_PATH};

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto.
    pub base_url: ApiUrl,
    /// Path of the login endpoint.
    pub login_path: String,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Buffered session events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl ClientConfig {
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            login_path: LOGIN_PATH.to_string(),
            refresh_path: REFRESH_PATH.to_string(),
            user_agent: concat!("opsdash/", env!("CARGO_PKG_VERSION")).to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        // broadcast::channel panics on zero
        self.event_capacity = capacity.max(1);
        self
    }
}
