//! Login credentials.

use std::fmt;

/// Username and password sent once to the login endpoint.
///
/// Only the username shows up in `Debug` output.
///
/// ```
/// use opsdash_core::Credentials;
///
/// let creds = Credentials::new("admin", "hunter2");
/// assert_eq!(creds.username(), "admin");
/// assert!(!format!("{:?}", creds).contains("hunter2"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// For building the login request body; never log it.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
