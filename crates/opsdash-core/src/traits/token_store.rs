//! Credential storage trait.

use crate::{AccessToken, RefreshToken, Result};

/// Storage for the access and refresh tokens of one session.
///
/// Implementations do not validate token contents. Writers are funneled
/// through login, logout and the single refresh in flight, so stores only
/// need enough locking to be safe for concurrent readers.
pub trait TokenStore: Send + Sync {
    /// Returns the current access token, if any.
    fn access_token(&self) -> Result<Option<AccessToken>>;

    /// Returns the current refresh token, if any.
    fn refresh_token(&self) -> Result<Option<RefreshToken>>;

    /// Replace the access token.
    fn set_access_token(&self, token: AccessToken) -> Result<()>;

    /// Replace the refresh token.
    fn set_refresh_token(&self, token: RefreshToken) -> Result<()>;

    /// Remove both tokens. Clearing an empty store is a no-op.
    fn clear(&self) -> Result<()>;
}
