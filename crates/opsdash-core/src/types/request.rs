//! Request description shared by the client and the executor.
//!
//! A [`RequestConfig`] is everything needed to (re)issue a call except the
//! path and the bearer credential. It is owned and cloneable so a call that
//! is rejected with 401 can be replayed byte-for-byte after a refresh.

use std::fmt;

/// HTTP method of an API call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text field.
    Text { name: String, value: String },
    /// A binary file field.
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        data: Vec<u8>,
    },
}

/// Request body.
///
/// JSON bodies are sent with `Content-Type: application/json`; multipart
/// forms let the transport choose the boundary content type.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Form(Vec<FormPart>),
}

impl Body {
    /// Whether the body is binary form data (no JSON content type).
    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Form(_))
    }
}

/// Configuration of a single API call.
///
/// # Example
///
/// ```
/// use opsdash_core::{Method, RequestConfig};
/// use serde_json::json;
///
/// let config = RequestConfig::post(json!({ "name": "db-01" }))
///     .with_header("X-Request-Id", "42");
/// assert_eq!(config.method, Method::Post);
/// assert!(!config.skip_token_refresh);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    pub body: Option<Body>,
    /// Caller headers, applied after the defaults so they can override them.
    pub headers: Vec<(String, String)>,
    /// Treat a 401 as final instead of refreshing and retrying.
    ///
    /// The login call sets this: a 401 there means bad credentials, not an
    /// expired token.
    pub skip_token_refresh: bool,
}

impl RequestConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self::new(Method::Post).with_json(body)
    }

    pub fn put(body: serde_json::Value) -> Self {
        Self::new(Method::Put).with_json(body)
    }

    pub fn patch(body: serde_json::Value) -> Self {
        Self::new(Method::Patch).with_json(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::Delete)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn with_form(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(Body::Form(parts));
        self
    }

    /// Add a header, replacing any existing header with the same name
    /// (names compare case-insensitively).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Returns the value of a header, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn skip_token_refresh(mut self) -> Self {
        self.skip_token_refresh = true;
        self
    }
}
