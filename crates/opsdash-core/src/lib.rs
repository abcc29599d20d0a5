//! opsdash-core - Core types and traits for the opsdash API client.

pub mod credentials;
pub mod error;
pub mod memory;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use memory::MemoryTokenStore;
pub use tokens::{AccessToken, RefreshToken};
pub use traits::TokenStore;
pub use types::{ApiUrl, Body, FormPart, Method, RequestConfig, SessionEvent, SessionState};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
