//! Derived session state and lifecycle events.

use std::fmt;

/// Where the session currently stands.
///
/// Never stored; derived from the token store and the refresh coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No access token.
    Anonymous,
    /// An access token is present.
    Authenticated,
    /// A refresh is in flight.
    Refreshing,
    /// Refresh failed and credentials were cleared. Terminal until login.
    Expired,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
            SessionState::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Lifecycle notifications delivered to subscribers of a client.
///
/// Hosts react to [`SessionEvent::Expired`] by sending the user back to
/// their login surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    Expired { reason: String },
    LoggedOut,
}
