//! opsdash-http - HTTP-backed authenticated API client.
//!
//! All dashboard calls flow through an [`ApiClient`]. It attaches the
//! current access token, refreshes it when the server answers 401 (one
//! refresh no matter how many calls fail together) and retries the call
//! once. When a refresh is impossible the session ends and subscribers
//! receive [`SessionEvent::Expired`](opsdash_core::SessionEvent::Expired).

mod client;
mod config;
mod endpoints;
mod executor;
mod refresh;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use endpoints::{LOGIN_PATH, REFRESH_PATH};
pub use executor::RequestExecutor;
pub use refresh::RefreshCoordinator;
