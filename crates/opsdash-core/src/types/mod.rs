//! Core client types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod api_url;
mod request;
mod session;

pub use api_url::ApiUrl;
pub use request::{Body, FormPart, Method, RequestConfig};
pub use session::{SessionEvent, SessionState};
