//! Dashboard API base URL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, InvalidInputError};

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Base URL every request path is joined onto.
///
/// Always absolute with a host. Plain `http` is accepted for loopback
/// hosts only, and the URL may carry a path prefix but no query or fragment.
///
/// ```
/// use opsdash_core::ApiUrl;
///
/// let api = ApiUrl::new("https://ops.example.com/").unwrap();
/// assert_eq!(api.endpoint("/api/servers/list").unwrap(),
///            "https://ops.example.com/api/servers/list");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiUrl(Url);

fn reject(value: &str, reason: impl Into<String>) -> Error {
    InvalidInputError::ApiUrl {
        value: value.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl ApiUrl {
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let raw = s.as_ref();
        let url = Url::parse(raw).map_err(|e| reject(raw, e.to_string()))?;

        let Some(host) = url.host_str() else {
            return Err(reject(raw, "missing host"));
        };
        match url.scheme() {
            "https" => {}
            "http" if LOOPBACK_HOSTS.contains(&host) => {}
            "http" => return Err(reject(raw, "plain http is only allowed for localhost")),
            other => return Err(reject(raw, format!("unsupported scheme '{}'", other))),
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(reject(raw, "must not carry a query or fragment"));
        }

        Ok(Self(url))
    }

    /// Absolute URL for a request path such as `/api/servers/list`.
    ///
    /// # Errors
    ///
    /// The path must start with exactly one `/`; anything else could point
    /// the bearer token at another host.
    pub fn endpoint(&self, path: &str) -> Result<String, Error> {
        if !path.starts_with('/') || path.starts_with("//") {
            return Err(InvalidInputError::Path {
                value: path.to_string(),
                reason: "must be an absolute path starting with a single '/'".to_string(),
            }
            .into());
        }

        // Url renders an empty path as "/".
        let base = self.0.as_str().trim_end_matches('/');
        Ok(format!("{}{}", base, path))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ApiUrl {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ApiUrl> for String {
    fn from(api: ApiUrl) -> Self {
        api.0.into()
    }
}
