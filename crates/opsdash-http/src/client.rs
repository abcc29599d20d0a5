//! Authenticated API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use opsdash_core::error::{AuthError, Error, InvalidInputError};
use opsdash_core::{
    AccessToken, Credentials, MemoryTokenStore, RefreshToken, RequestConfig, Result,
    SessionEvent, SessionState, TokenStore,
};

use crate::config::ClientConfig;
use crate::endpoints::{LoginRequest, LoginResponse};
use crate::executor::RequestExecutor;
use crate::refresh::RefreshCoordinator;

const AUTHORIZATION: &str = "Authorization";

/// The entry point for every dashboard API call.
///
/// Attaches the current access token, and when a call is rejected with 401
/// refreshes the token (sharing one refresh between concurrent callers) and
/// retries the call once with the new token.
///
/// Clients are cheap to clone (they use internal `Arc`) and are safe to
/// share across tasks. Clones share the token store, the refresh slot and
/// the event channel.
///
/// # Example
///
/// ```no_run
/// use opsdash_core::{ApiUrl, Credentials};
/// use opsdash_http::{ApiClient, ClientConfig};
///
/// # async fn example() -> Result<(), opsdash_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://ops.example.com")?);
/// let client = ApiClient::with_memory_store(config)?;
/// client.login(&Credentials::new("admin", "secret")).await?;
///
/// let servers: serde_json::Value = client.get("/api/servers/list").await?;
/// println!("{}", servers);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    executor: RequestExecutor,
    store: Arc<dyn TokenStore>,
    coordinator: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client that keeps its tokens in `store`.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let executor = RequestExecutor::new(&config)?;
        let (events, _) = broadcast::channel(config.event_capacity);
        let coordinator = RefreshCoordinator::new(
            executor.clone(),
            Arc::clone(&store),
            config.refresh_path.clone(),
            events.clone(),
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                executor,
                store,
                coordinator,
                events,
            }),
        })
    }

    /// Create a client with a process-scoped in-memory token store.
    pub fn with_memory_store(config: ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryTokenStore::new()))
    }

    /// Returns the configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the token store backing this client.
    pub fn store(&self) -> &dyn TokenStore {
        self.inner.store.as_ref()
    }

    /// Subscribe to session lifecycle events.
    ///
    /// Only events sent after subscribing are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Derive the current session state.
    ///
    /// `Expired` is tracked in memory by this client. A new client over a
    /// persistent store whose session already expired sees `Anonymous`.
    pub fn session_state(&self) -> Result<SessionState> {
        if self.inner.coordinator.is_refreshing() {
            return Ok(SessionState::Refreshing);
        }
        if self.inner.store.access_token()?.is_some() {
            return Ok(SessionState::Authenticated);
        }
        if self.inner.coordinator.is_expired() {
            return Ok(SessionState::Expired);
        }
        Ok(SessionState::Anonymous)
    }

    /// Log in and store the returned token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the server answers 401.
    /// That 401 never triggers a token refresh.
    #[instrument(skip(self, credentials), fields(api = %self.inner.config.base_url, username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        info!("Logging in");

        let body = to_json(&LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        })?;
        let config = RequestConfig::post(body).skip_token_refresh();

        let value = match self.call_value(&self.inner.config.login_path, config).await {
            Ok(value) => value,
            Err(Error::Api(err)) if err.is_unauthorized() => {
                return Err(AuthError::InvalidCredentials(err).into());
            }
            Err(err) => return Err(err),
        };

        let response: LoginResponse = serde_json::from_value(value)?;
        self.inner.coordinator.replace_session(|store| {
            store.set_access_token(AccessToken::new(response.access_token))?;
            store.set_refresh_token(RefreshToken::new(response.refresh_token))
        })?;

        debug!("Logged in");
        let _ = self.inner.events.send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Forget the stored tokens.
    ///
    /// A refresh still in flight will not bring them back.
    #[instrument(skip(self), fields(api = %self.inner.config.base_url))]
    pub fn logout(&self) -> Result<()> {
        self.inner.coordinator.replace_session(|store| store.clear())?;

        info!("Logged out");
        let _ = self.inner.events.send(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Refresh the access token now, joining a refresh already in flight.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.coordinator.refresh().await.map(|_| ())
    }

    /// Call an API endpoint and decode the JSON result into `T`.
    ///
    /// A 204 response decodes from `null`, so `()`, `Option<_>` and
    /// `serde_json::Value` all accept it.
    ///
    /// # Errors
    ///
    /// - [`Error::Api`] for a non-success status other than a handled 401
    /// - [`AuthError::Unauthorized`] if the retry after a refresh is also rejected
    /// - [`AuthError::SessionExpired`] if the token could not be refreshed
    /// - [`Error::Transport`] for network failures and undecodable bodies
    #[instrument(skip(self, config), fields(api = %self.inner.config.base_url, method = %config.method))]
    pub async fn call<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T> {
        let value = self.call_value(path, config).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET` a path.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(path, RequestConfig::get()).await
    }

    /// `POST` a JSON body to a path.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(path, RequestConfig::post(to_json(body)?)).await
    }

    /// `PUT` a JSON body to a path.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(path, RequestConfig::put(to_json(body)?)).await
    }

    /// `DELETE` a path.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(path, RequestConfig::delete()).await
    }

    async fn call_value(&self, path: &str, config: RequestConfig) -> Result<Value> {
        let token = self.inner.store.access_token()?;

        match self.send(path, &config, token.as_ref()).await {
            Err(err) if err.is_unauthorized() && !config.skip_token_refresh => {
                debug!(path, "Access token rejected, refreshing");
                let fresh = self.inner.coordinator.refresh().await?;

                // One retry only, with the token the refresh returned.
                match self.send(path, &config, Some(&fresh)).await {
                    Err(Error::Api(err)) if err.is_unauthorized() => {
                        warn!(path, "Request rejected again after token refresh");
                        Err(AuthError::Unauthorized(err).into())
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send(
        &self,
        path: &str,
        config: &RequestConfig,
        token: Option<&AccessToken>,
    ) -> Result<Value> {
        match token {
            Some(token) => {
                let authed = config.clone().with_header(AUTHORIZATION, token.bearer());
                self.inner.executor.execute(path, &authed).await
            }
            None => self.inner.executor.execute(path, config).await,
        }
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| {
        Error::InvalidInput(InvalidInputError::Other {
            message: format!("failed to encode request body: {}", e),
        })
    })
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api", &self.inner.config.base_url)
            .field("coordinator", &self.inner.coordinator)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdash_core::ApiUrl;

    fn client() -> ApiClient {
        let config = ClientConfig::new(ApiUrl::new("http://127.0.0.1:9").unwrap());
        ApiClient::with_memory_store(config).unwrap()
    }

    #[test]
    fn new_client_is_anonymous() {
        assert_eq!(client().session_state().unwrap(), SessionState::Anonymous);
    }

    #[test]
    fn stored_token_means_authenticated() {
        let client = client();
        client
            .store()
            .set_access_token(AccessToken::new("a"))
            .unwrap();
        assert_eq!(
            client.session_state().unwrap(),
            SessionState::Authenticated
        );
    }

    #[test]
    fn logout_clears_tokens_and_notifies() {
        let client = client();
        let mut events = client.subscribe();
        client
            .store()
            .set_access_token(AccessToken::new("a"))
            .unwrap();

        client.logout().unwrap();
        client.logout().unwrap();

        assert_eq!(client.session_state().unwrap(), SessionState::Anonymous);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn debug_hides_tokens() {
        let client = client();
        client
            .store()
            .set_access_token(AccessToken::new("secret-access"))
            .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("[REDACTED]"));
    }
}
