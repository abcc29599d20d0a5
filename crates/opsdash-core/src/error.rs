//! Error types for the opsdash client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, API status, authentication, storage, and input validation
//! errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for opsdash operations.
///
/// UI layers render failures through [`Error::status`], [`Error::body`]
/// and the `Display` message; callers that need to react to a specific
/// case match on the variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, undecodable body).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Authentication errors (bad credentials, expired session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Token store errors (I/O, corrupt document).
    #[error("token store error: {0}")]
    Store(#[from] StoreError),

    /// Input validation errors (invalid URL, header, path).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            Error::Auth(AuthError::InvalidCredentials(err))
            | Error::Auth(AuthError::Unauthorized(err)) => Some(err.status),
            _ => None,
        }
    }

    /// Error body returned by the server, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Error::Api(err) => err.body.as_ref(),
            Error::Auth(AuthError::InvalidCredentials(err))
            | Error::Auth(AuthError::Unauthorized(err)) => err.body.as_ref(),
            _ => None,
        }
    }

    /// Returns true for a plain 401 response that has not been handled yet.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api(err) if err.is_unauthorized())
    }

    /// Returns true if the session can no longer be used without a new login.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionExpired { .. }))
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// A success body could not be decoded into the expected shape.
    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login endpoint rejected the username or password.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(ApiError),

    /// A call was still rejected after retrying with a refreshed token.
    #[error("unauthorized: {0}")]
    Unauthorized(ApiError),

    /// No usable refresh token, or the refresh call failed.
    #[error("session expired: {reason}")]
    SessionExpired { reason: String },
}

/// A non-success response from the API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Parsed error body, or the raw text as a JSON string.
    pub body: Option<serde_json::Value>,
    /// The body's `message` field, or the status reason.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, body: Option<serde_json::Value>, message: impl Into<String>) -> Self {
        Self {
            status,
            body,
            message: message.into(),
        }
    }

    /// Check if this is a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Token store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The stored document could not be parsed.
    #[error("corrupt token document: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid request path.
    #[error("invalid path '{value}': {reason}")]
    Path { value: String, reason: String },

    /// Header name or value not representable on the wire.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
