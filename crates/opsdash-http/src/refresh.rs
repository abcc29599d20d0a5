//! Single-flight access token refresh.
//!
//! However many calls see a 401 at once, only one refresh request is sent.
//! Every caller that arrives while it is in flight awaits the same shared
//! future and receives the same token or the same failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use opsdash_core::error::AuthError;
use opsdash_core::{AccessToken, RefreshToken, RequestConfig, Result, SessionEvent, TokenStore};

use crate::endpoints::{RefreshRequest, RefreshResponse};
use crate::executor::RequestExecutor;

/// Outcome shared by every caller joined to one refresh. The error side is
/// the reason the session ended.
type RefreshOutcome = std::result::Result<AccessToken, String>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Guarantees at most one refresh in flight per session.
///
/// Cheap to clone; clones share the in-flight slot.
///
/// On failure the coordinator clears both tokens and broadcasts
/// [`SessionEvent::Expired`] once, no matter how many callers were waiting.
///
/// Every credential write goes through the coordinator's session lock.
/// Login and logout replace the session with [`replace_session`], which
/// bumps a generation counter; a refresh that started under an older
/// generation discards its result instead of writing over the new session.
///
/// [`replace_session`]: RefreshCoordinator::replace_session
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    executor: RequestExecutor,
    store: Arc<dyn TokenStore>,
    refresh_path: String,
    events: broadcast::Sender<SessionEvent>,
    in_flight: Mutex<Option<InFlight>>,
    /// Session generation; held while tokens are written.
    session: Mutex<u64>,
    expired: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new(
        executor: RequestExecutor,
        store: Arc<dyn TokenStore>,
        refresh_path: impl Into<String>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                executor,
                store,
                refresh_path: refresh_path.into(),
                events,
                in_flight: Mutex::new(None),
                session: Mutex::new(0),
                expired: AtomicBool::new(false),
            }),
        }
    }

    /// Obtain a fresh access token, joining a refresh already in flight.
    ///
    /// If the session was replaced while the refresh ran, the refresh result
    /// is dropped and callers get the replacement session's access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionExpired`] if there is no refresh token or
    /// the refresh call fails. Credentials have been cleared by then.
    pub async fn refresh(&self) -> Result<AccessToken> {
        let flight = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(flight) => {
                    debug!("Joining refresh already in flight");
                    flight.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        let outcome = inner.run().await;
                        // Cleared before anyone observes the outcome, so a
                        // later 401 starts a new refresh instead of reusing
                        // this one.
                        inner.clear_in_flight();
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        flight
            .await
            .map_err(|reason| AuthError::SessionExpired { reason }.into())
    }

    /// Start a new session: run `apply` against the store under the session
    /// lock and forget any earlier expiry.
    ///
    /// A refresh in flight when this is called will not write its result.
    pub fn replace_session(
        &self,
        apply: impl FnOnce(&dyn TokenStore) -> Result<()>,
    ) -> Result<()> {
        let mut generation = self.inner.lock_session();
        *generation += 1;
        self.inner.expired.store(false, Ordering::SeqCst);
        apply(self.inner.store.as_ref())
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Whether the last refresh failed and no login has happened since.
    pub fn is_expired(&self) -> bool {
        self.inner.expired.load(Ordering::SeqCst)
    }
}

impl CoordinatorInner {
    fn lock_session(&self) -> MutexGuard<'_, u64> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(skip(self), fields(path = %self.refresh_path))]
    async fn run(&self) -> RefreshOutcome {
        let (started, refresh_token) = {
            let generation = self.lock_session();
            (*generation, self.store.refresh_token())
        };

        info!("Refreshing access token");
        let exchanged = match refresh_token {
            Ok(Some(token)) => self.exchange(&token).await,
            Ok(None) => Err("no refresh token available".to_string()),
            Err(err) => Err(err.to_string()),
        };

        self.commit(started, exchanged)
    }

    async fn exchange(
        &self,
        refresh_token: &RefreshToken,
    ) -> std::result::Result<RefreshResponse, String> {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: refresh_token.as_str(),
        })
        .map_err(|e| format!("failed to encode refresh request: {}", e))?;

        // Straight to the executor: a 401 here must not trigger another refresh.
        let config = RequestConfig::post(body).skip_token_refresh();
        let value = self
            .executor
            .execute(&self.refresh_path, &config)
            .await
            .map_err(|e| format!("refresh request failed: {}", e))?;

        serde_json::from_value(value).map_err(|e| format!("unexpected refresh response: {}", e))
    }

    /// Apply a refresh result, unless the session was replaced meanwhile.
    fn commit(
        &self,
        started: u64,
        exchanged: std::result::Result<RefreshResponse, String>,
    ) -> RefreshOutcome {
        let generation = self.lock_session();

        if *generation != started {
            debug!("Session replaced during refresh, discarding result");
            return match self.store.access_token() {
                Ok(Some(token)) => Ok(token),
                Ok(None) => Err("session ended during refresh".to_string()),
                Err(err) => Err(err.to_string()),
            };
        }

        match exchanged.and_then(|response| self.store_tokens(response)) {
            Ok(token) => {
                debug!("Access token refreshed");
                self.expired.store(false, Ordering::SeqCst);
                // No subscribers is fine.
                let _ = self.events.send(SessionEvent::Refreshed);
                Ok(token)
            }
            Err(reason) => {
                warn!(%reason, "Token refresh failed, ending session");
                self.expire(&reason);
                Err(reason)
            }
        }
    }

    fn store_tokens(&self, response: RefreshResponse) -> RefreshOutcome {
        let access_token = AccessToken::new(response.access_token);
        self.store
            .set_access_token(access_token.clone())
            .map_err(|e| e.to_string())?;
        if let Some(rotated) = response.refresh_token {
            self.store
                .set_refresh_token(RefreshToken::new(rotated))
                .map_err(|e| e.to_string())?;
        }
        Ok(access_token)
    }

    fn expire(&self, reason: &str) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear tokens after refresh failure");
        }
        self.expired.store(true, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::Expired {
            reason: reason.to_string(),
        });
    }

    fn clear_in_flight(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.inner.refresh_path)
            .field("refreshing", &self.is_refreshing())
            .field("expired", &self.is_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdash_core::{ApiUrl, MemoryTokenStore};

    use crate::config::ClientConfig;

    fn coordinator(
        store: Arc<dyn TokenStore>,
    ) -> (RefreshCoordinator, broadcast::Receiver<SessionEvent>) {
        let config = ClientConfig::new(ApiUrl::new("http://127.0.0.1:9").unwrap());
        let executor = RequestExecutor::new(&config).unwrap();
        let (tx, rx) = broadcast::channel(8);
        (
            RefreshCoordinator::new(executor, store, "/auth/refresh", tx),
            rx,
        )
    }

    #[tokio::test]
    async fn missing_refresh_token_expires_session_without_network() {
        let store = Arc::new(MemoryTokenStore::with_tokens(AccessToken::new("a"), None));
        let (coordinator, mut events) = coordinator(store.clone());

        let err = coordinator.refresh().await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(err.to_string().contains("no refresh token"));

        assert!(store.access_token().unwrap().is_none());
        assert!(coordinator.is_expired());
        assert!(!coordinator.is_refreshing());
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Expired {
                reason: "no refresh token available".into()
            }
        );
    }

    #[tokio::test]
    async fn replacing_the_session_clears_expired_flag() {
        let store = Arc::new(MemoryTokenStore::new());
        let (coordinator, _events) = coordinator(store.clone());

        let _ = coordinator.refresh().await;
        assert!(coordinator.is_expired());

        coordinator
            .replace_session(|store| store.set_access_token(AccessToken::new("a2")))
            .unwrap();
        assert!(!coordinator.is_expired());
        assert_eq!(store.access_token().unwrap(), Some(AccessToken::new("a2")));
    }

    #[test]
    fn debug_output() {
        let (coordinator, _events) = coordinator(Arc::new(MemoryTokenStore::new()));
        let debug = format!("{:?}", coordinator);
        assert!(debug.contains("/auth/refresh"));
        assert!(debug.contains("refreshing: false"));
    }
}
