//! In-memory token store.

use std::sync::{PoisonError, RwLock};

use crate::traits::TokenStore;
use crate::{AccessToken, RefreshToken, Result};

/// Process-scoped token store.
///
/// Tokens live only as long as the process, so every new process has to
/// log in again.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

#[derive(Debug, Default)]
struct StoredTokens {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with tokens, e.g. restored from elsewhere.
    pub fn with_tokens(access_token: AccessToken, refresh_token: Option<RefreshToken>) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access_token: Some(access_token),
                refresh_token,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Result<Option<AccessToken>> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.access_token.clone())
    }

    fn refresh_token(&self) -> Result<Option<RefreshToken>> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.refresh_token.clone())
    }

    fn set_access_token(&self, token: AccessToken) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_token = Some(token);
        Ok(())
    }

    fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.refresh_token = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *tokens = StoredTokens::default();
        Ok(())
    }
}
