//! Opaque session tokens.
//!
//! Both token kinds are plain strings issued by the server. Their `Debug`
//! output is redacted so a token never ends up in a log line.

use std::fmt;

macro_rules! secret_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// The raw value, for request headers and the token store only.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(***)"))
            }
        }
    };
}

secret_token!(
    /// Short-lived credential sent as `Authorization: Bearer` on protected calls.
    AccessToken
);

secret_token!(
    /// Long-lived credential exchanged at the refresh endpoint for a new
    /// access token. Never sent anywhere else.
    RefreshToken
);

impl AccessToken {
    /// The `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}
